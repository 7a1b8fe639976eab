//! Display formatting shared by every screen: money, points, dates,
//! countdowns and progress.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::fmt;

pub const CURRENCY_SYMBOL: &str = "$";

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Format money for display, e.g. `$12.50` or `-$3.00`
pub fn format_money(amount: f64) -> String {
    let rounded = round_cents(amount);
    if rounded < 0.0 {
        format!("-{}{:.2}", CURRENCY_SYMBOL, rounded.abs())
    } else {
        format!("{}{:.2}", CURRENCY_SYMBOL, rounded.abs())
    }
}

/// Format money with an explicit sign, e.g. `+$1.00`
pub fn format_signed_money(amount: f64) -> String {
    let rounded = round_cents(amount);
    if rounded > 0.0 {
        format!("+{}", format_money(rounded))
    } else {
        format_money(rounded)
    }
}

/// Format a points amount, e.g. `1 point`, `25 points`
pub fn format_points(points: i64) -> String {
    if points.abs() == 1 {
        format!("{} point", points)
    } else {
        format!("{} points", points)
    }
}

/// Format a `YYYY-MM-DD` date or an RFC 3339 timestamp as `January 5, 2025`.
/// Unparseable input is returned unchanged.
pub fn format_date(value: &str) -> String {
    let date = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"));

    match date {
        Ok(date) => format!(
            "{} {}, {}",
            MONTH_NAMES[date.month0() as usize],
            date.day(),
            date.year()
        ),
        Err(_) => value.to_string(),
    }
}

/// Round to whole cents
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Time remaining until an event starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// `None` once `target` has been reached
    pub fn until(target: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let remaining = (target - now).num_seconds();
        if remaining <= 0 {
            return None;
        }

        Some(Self {
            days: remaining / 86_400,
            hours: (remaining % 86_400) / 3_600,
            minutes: (remaining % 3_600) / 60,
            seconds: remaining % 60,
        })
    }

    pub fn total_seconds(&self) -> i64 {
        self.days * 86_400 + self.hours * 3_600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d {:02}h {:02}m {:02}s", self.days, self.hours, self.minutes, self.seconds)
    }
}

/// Countdown label for an RFC 3339 start time
pub fn format_countdown(starts_at: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(starts_at) {
        Ok(target) => match Countdown::until(target.with_timezone(&Utc), now) {
            Some(countdown) => countdown.to_string(),
            None => "Started".to_string(),
        },
        Err(_) => starts_at.to_string(),
    }
}

/// Progress towards a target as a whole percentage in 0..=100
pub fn progress_percent(current: f64, target: f64) -> u8 {
    if target <= 0.0 {
        return 100;
    }
    let percent = (current / target * 100.0).floor();
    percent.clamp(0.0, 100.0) as u8
}
