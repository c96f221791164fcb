//! Choosing one creation time out of many observations

use super::{DateObservation, DateSource};
use crate::config::ImportSettings;
use chrono::{NaiveDateTime, TimeDelta};
use tracing::debug;

/// Largest amount a camera clock may run ahead of the GPS clock and still be trusted
fn gps_clock_tolerance() -> TimeDelta {
    TimeDelta::hours(1)
}

/// Plausibility rules for observed timestamps
#[derive(Debug, Clone, Copy)]
pub struct DateFilter<'a> {
    pub minimum_valid_date: NaiveDateTime,
    pub ignored_dates: &'a [NaiveDateTime],
}

impl<'a> DateFilter<'a> {
    pub fn from_settings(settings: &'a ImportSettings) -> Self {
        Self {
            minimum_valid_date: settings.minimum_valid_date,
            ignored_dates: &settings.ignored_dates,
        }
    }

    /// True when `timestamp` is neither a placeholder date, too old, nor in the future
    pub fn accepts(&self, timestamp: &NaiveDateTime, now: &NaiveDateTime) -> bool {
        !self.ignored_dates.contains(timestamp)
            && *timestamp >= self.minimum_valid_date
            && timestamp <= now
    }
}

/// Pick the most trustworthy observation
///
/// GPS and EXIF-original get special treatment: the camera clock wins only
/// when it runs ahead of GPS by at most an hour (a timezone-free clock that
/// was set close to UTC). Otherwise the reliability ladder decides, with the
/// later timestamp winning ties.
pub fn arbitrate<I>(
    observations: I,
    now: NaiveDateTime,
    filter: &DateFilter<'_>,
) -> Option<DateObservation>
where
    I: IntoIterator<Item = DateObservation>,
{
    let qualifying: Vec<DateObservation> = observations
        .into_iter()
        .filter(|o| filter.accepts(&o.timestamp, &now))
        .collect();

    let latest_of = |source: DateSource| {
        qualifying
            .iter()
            .filter(|o| o.source == source)
            .max_by_key(|o| o.timestamp)
            .copied()
    };

    let gps = latest_of(DateSource::Gps);
    let primary = latest_of(DateSource::MetadataPrimary);
    if let (Some(gps), Some(primary)) = (gps, primary) {
        let ahead = primary.timestamp - gps.timestamp;
        let chosen = if ahead > TimeDelta::zero() && ahead <= gps_clock_tolerance() {
            primary
        } else {
            gps
        };
        debug!(source = %chosen.source, timestamp = %chosen.timestamp, "Resolved date from GPS and EXIF");
        return Some(chosen);
    }

    let chosen = qualifying.into_iter().max_by(|a, b| {
        a.source
            .reliability()
            .cmp(&b.source.reliability())
            .then(a.timestamp.cmp(&b.timestamp))
    });

    if let Some(chosen) = &chosen {
        debug!(source = %chosen.source, timestamp = %chosen.timestamp, "Resolved date");
    }
    chosen
}
