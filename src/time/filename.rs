//! Filename timestamp parsing

use super::layout::{DateLayout, Field};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::{trace, warn};

/// Layouts recognized inside file names, in library order
const LAYOUTS: &[&str] = &[
    "yyyyMMddHHmmss",
    "yyyyMMddHHmm",
    "yyyyMMdd HHmmss",
    "yyyyMMdd HHmm",
    "yyyyMMdd_HHmmss",
    "yyyyMMdd_HHmm",
    "yyMMddHHmmss",
    "yyMMddHHmm",
    "yyMMdd HHmmss",
    "yyMMdd HHmm",
    "yyMMdd_HHmmss",
    "yyMMdd_HHmm",
    "yyyy-MM-dd-HH-mm-ss",
    "yyyy-MM-dd HH-mm-ss",
    "yyyy-MM-dd-HH-mm",
    "yyyy-MM-dd HH-mm",
    "yy-MM-dd-HH-mm-ss",
    "yy-MM-dd HH-mm-ss",
    "yy-MM-dd-HH-mm",
    "yy-MM-dd HH-mm",
    "yyyy_MM_dd_HH_mm_ss",
    "yyyy_MM_dd_HH_mm",
    "yyyy_MM_dd HH_mm_ss",
    "yyyy_MM_dd HH_mm",
    "yy_MM_dd_HH_mm_ss",
    "yy_MM_dd_HH_mm",
    "yy_MM_dd HH_mm_ss",
    "yy_MM_dd HH_mm",
    "yyyyMMdd",
    "yyyy-MM-dd",
    "yyyy_MM_dd",
    "yyMMdd",
    "yy-MM-dd",
    "yy_MM_dd",
    "ddMMyyyy",
    "dd-MM-yyyy",
    "dd_MM_yyyy",
    "ddMMyy",
    "dd-MM-yy",
    "dd_MM_yy",
];

/// Two-digit years below this belong to the 2000s
const TWO_DIGIT_YEAR_PIVOT: i32 = 50;

struct CompiledLayout {
    layout: DateLayout,
    regex: Regex,
}

static COMPILED: OnceLock<Vec<CompiledLayout>> = OnceLock::new();

/// Compiled layouts, longest layout string first (stable, so ties keep
/// library order)
fn compiled_layouts() -> &'static [CompiledLayout] {
    COMPILED.get_or_init(|| {
        let mut compiled: Vec<CompiledLayout> = LAYOUTS
            .iter()
            .filter_map(|source| {
                let layout = DateLayout::parse(source);
                match layout.to_regex() {
                    Ok(regex) => Some(CompiledLayout { layout, regex }),
                    Err(e) => {
                        warn!(layout = source, error = %e, "Skipping filename layout");
                        None
                    }
                }
            })
            .collect();
        compiled.sort_by(|a, b| b.layout.as_str().len().cmp(&a.layout.as_str().len()));
        compiled
    })
}

/// The built-in filename layouts, in library order
pub fn supported_layouts() -> &'static [&'static str] {
    LAYOUTS
}

/// Pick the timestamp that supplies fields missing from a filename layout
///
/// Starts from the creation time when it is plausible, and falls back to the
/// modification time when that is earlier but still plausible.
pub fn default_fields(
    created: Option<NaiveDateTime>,
    modified: NaiveDateTime,
    minimum_valid_date: NaiveDateTime,
) -> NaiveDateTime {
    let mut defaults = match created {
        Some(created) if created >= minimum_valid_date => created,
        _ => modified,
    };
    if modified < defaults && modified >= minimum_valid_date {
        defaults = modified;
    }
    defaults
}

/// Find every plausible timestamp in `file_name`
///
/// Each layout contributes at most its leftmost match. The iterator is lazy
/// and can be restarted by calling this function again.
pub fn parse_filename_dates<'a>(
    file_name: &'a str,
    defaults: NaiveDateTime,
) -> impl Iterator<Item = NaiveDateTime> + 'a {
    compiled_layouts().iter().filter_map(move |compiled| {
        let caps = compiled.regex.captures(file_name)?;
        let parsed = datetime_from_captures(&caps, &defaults);
        if let Some(dt) = parsed {
            trace!(file_name, layout = compiled.layout.as_str(), %dt, "Matched filename layout");
        }
        parsed
    })
}

/// First timestamp found in `file_name`, if any
pub fn parse_filename_time(file_name: &str, defaults: NaiveDateTime) -> Option<NaiveDateTime> {
    parse_filename_dates(file_name, defaults).next()
}

/// Map a two-digit year into 1950..=2049
pub fn expand_two_digit_year(year: i32) -> i32 {
    if year < TWO_DIGIT_YEAR_PIVOT {
        2000 + year
    } else {
        1900 + year
    }
}

fn datetime_from_captures(caps: &Captures<'_>, defaults: &NaiveDateTime) -> Option<NaiveDateTime> {
    let field = |field: Field, default: u32| -> Option<u32> {
        match caps.name(field.group_name()) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let year = match caps.name(Field::Year.group_name()) {
        Some(m) => {
            let value: i32 = m.as_str().parse().ok()?;
            if m.as_str().len() == 2 {
                expand_two_digit_year(value)
            } else {
                value
            }
        }
        None => defaults.year(),
    };

    build_datetime(
        year,
        field(Field::Month, defaults.month())?,
        field(Field::Day, defaults.day())?,
        field(Field::Hour, defaults.hour())?,
        field(Field::Minute, defaults.minute())?,
        field(Field::Second, defaults.second())?,
    )
}

fn build_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<NaiveDateTime> {
    if year < 1 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}
