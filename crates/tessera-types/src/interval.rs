//! Interval value objects and their ISO-8601 round-trips.

use core::fmt;
use std::str::FromStr;

use chrono::Duration;

use crate::error::TypeError;

/// Microseconds per second.
const MICROS_PER_SECOND: i64 = 1_000_000;
/// Microseconds per minute.
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
/// Microseconds per hour.
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// PostgreSQL-style interval: months, days, and sub-day microseconds are
/// tracked independently because they do not convert into one another
/// (a month is not a fixed number of days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PostgresInterval {
    /// Whole months, carried exactly as the month component was written.
    /// Producers that work in years fold them into months before
    /// rendering.
    pub months: i32,
    /// Whole days.
    pub days: i32,
    /// Sub-day time as microseconds.
    pub microseconds: i64,
}

impl PostgresInterval {
    /// The zero interval.
    pub const ZERO: Self = Self {
        months: 0,
        days: 0,
        microseconds: 0,
    };

    /// Create an interval from its three independent components.
    #[must_use]
    pub fn new(months: i32, days: i32, microseconds: i64) -> Self {
        Self {
            months,
            days,
            microseconds,
        }
    }

    /// Parse an ISO-8601 duration (`P1Y2M3DT4H5M6.5S`).
    ///
    /// Invalid input yields the zero interval rather than an error; interval
    /// columns coming back from loosely-typed drivers routinely carry
    /// unparseable noise.
    #[must_use]
    pub fn parse_lossy(input: &str) -> Self {
        Self::from_str(input).unwrap_or(Self::ZERO)
    }

    /// Whether every component is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for PostgresInterval {
    /// Renders the canonical ISO-8601 form. Months render as a bare `M`
    /// component, never split into years, so the text round-trips to the
    /// same three fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("PT0S");
        }
        f.write_str("P")?;
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.microseconds != 0 {
            f.write_str("T")?;
            write_time_part(f, self.microseconds)?;
        }
        Ok(())
    }
}

impl FromStr for PostgresInterval {
    type Err = TypeError;

    /// The month field carries the `M` component as written; a `Y`
    /// component is accepted in the input but belongs to the producer,
    /// which folds years into months before rendering.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = parse_iso8601(s)?;
        Ok(Self {
            months: parsed.months,
            days: parsed.days,
            microseconds: parsed.microseconds,
        })
    }
}

impl From<Duration> for PostgresInterval {
    fn from(d: Duration) -> Self {
        let micros = d.num_microseconds().unwrap_or(0);
        Self {
            months: 0,
            days: 0,
            microseconds: micros,
        }
    }
}

/// Oracle `INTERVAL YEAR TO MONTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalYearMonth {
    /// Whole years.
    pub years: i32,
    /// Months beyond the whole years.
    pub months: i32,
}

impl IntervalYearMonth {
    /// The zero interval.
    pub const ZERO: Self = Self { years: 0, months: 0 };

    /// Create a year-month interval.
    #[must_use]
    pub fn new(years: i32, months: i32) -> Self {
        Self { years, months }
    }

    /// Total months represented.
    #[must_use]
    pub fn total_months(&self) -> i64 {
        i64::from(self.years) * 12 + i64::from(self.months)
    }

    /// Parse ISO-8601 input, yielding the zero interval on failure.
    #[must_use]
    pub fn parse_lossy(input: &str) -> Self {
        Self::from_str(input).unwrap_or(Self::ZERO)
    }

    /// Render the canonical ISO-8601 form (`P1Y2M`).
    #[must_use]
    pub fn to_iso(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IntervalYearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.years == 0 && self.months == 0 {
            return f.write_str("P0M");
        }
        f.write_str("P")?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        Ok(())
    }
}

impl FromStr for IntervalYearMonth {
    type Err = TypeError;

    /// This type holds both components, so overflow months normalise
    /// into years (`P15M` reads as one year, three months).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = parse_iso8601(s)?;
        if parsed.days != 0 || parsed.microseconds != 0 {
            return Err(TypeError::format("year-month interval", s));
        }
        let total = i64::from(parsed.years) * 12 + i64::from(parsed.months);
        Ok(Self {
            years: (total / 12) as i32,
            months: (total % 12) as i32,
        })
    }
}

/// Oracle `INTERVAL DAY TO SECOND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalDaySecond {
    /// Whole days.
    pub days: i32,
    /// Sub-day time as microseconds.
    pub microseconds: i64,
}

impl IntervalDaySecond {
    /// The zero interval.
    pub const ZERO: Self = Self {
        days: 0,
        microseconds: 0,
    };

    /// Create a day-second interval from days and a sub-day duration.
    #[must_use]
    pub fn new(days: i32, time: Duration) -> Self {
        Self {
            days,
            microseconds: time.num_microseconds().unwrap_or(0),
        }
    }

    /// The sub-day component as a [`chrono::Duration`].
    #[must_use]
    pub fn time(&self) -> Duration {
        Duration::microseconds(self.microseconds)
    }

    /// Parse ISO-8601 input, yielding the zero interval on failure.
    #[must_use]
    pub fn parse_lossy(input: &str) -> Self {
        Self::from_str(input).unwrap_or(Self::ZERO)
    }

    /// Render the canonical ISO-8601 form (`P2DT4H5M6S`).
    #[must_use]
    pub fn to_iso(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IntervalDaySecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days == 0 && self.microseconds == 0 {
            return f.write_str("PT0S");
        }
        f.write_str("P")?;
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.microseconds != 0 {
            f.write_str("T")?;
            write_time_part(f, self.microseconds)?;
        }
        Ok(())
    }
}

impl FromStr for IntervalDaySecond {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = parse_iso8601(s)?;
        if parsed.years != 0 || parsed.months != 0 {
            return Err(TypeError::format("day-second interval", s));
        }
        Ok(Self {
            days: parsed.days,
            microseconds: parsed.microseconds,
        })
    }
}

impl From<Duration> for IntervalDaySecond {
    fn from(d: Duration) -> Self {
        let total = d.num_microseconds().unwrap_or(0);
        let per_day = 24 * MICROS_PER_HOUR;
        Self {
            days: (total / per_day) as i32,
            microseconds: total % per_day,
        }
    }
}

fn write_time_part(f: &mut fmt::Formatter<'_>, micros: i64) -> fmt::Result {
    let negative = micros < 0;
    let mut rest = micros.abs();
    if negative {
        f.write_str("-")?;
    }
    let hours = rest / MICROS_PER_HOUR;
    rest %= MICROS_PER_HOUR;
    let minutes = rest / MICROS_PER_MINUTE;
    rest %= MICROS_PER_MINUTE;
    let seconds = rest / MICROS_PER_SECOND;
    let fraction = rest % MICROS_PER_SECOND;
    if hours != 0 {
        write!(f, "{hours}H")?;
    }
    if minutes != 0 {
        write!(f, "{minutes}M")?;
    }
    if seconds != 0 || fraction != 0 || (hours == 0 && minutes == 0) {
        if fraction != 0 {
            let frac = format!("{fraction:06}");
            write!(f, "{seconds}.{}S", frac.trim_end_matches('0'))?;
        } else {
            write!(f, "{seconds}S")?;
        }
    }
    Ok(())
}

struct ParsedIso {
    years: i32,
    months: i32,
    days: i32,
    microseconds: i64,
}

/// Shared ISO-8601 duration scanner. Years and months are kept as the
/// separate components they were written with; consumers that fold do so
/// themselves. Weeks fold into days. Fractions are accepted on the
/// seconds component only.
fn parse_iso8601(input: &str) -> Result<ParsedIso, TypeError> {
    let s = input.trim();
    let (negate, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let body = s
        .strip_prefix('P')
        .or_else(|| s.strip_prefix('p'))
        .ok_or_else(|| TypeError::format("ISO-8601 duration", input))?;
    if body.is_empty() {
        return Err(TypeError::format("ISO-8601 duration", input));
    }

    let mut years: i64 = 0;
    let mut months: i64 = 0;
    let mut days: i64 = 0;
    let mut micros: i64 = 0;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in body.chars() {
        match c {
            'T' | 't' => {
                if in_time || !number.is_empty() {
                    return Err(TypeError::format("ISO-8601 duration", input));
                }
                in_time = true;
            }
            '0'..='9' | '.' | '-' | '+' => number.push(c),
            unit => {
                if number.is_empty() {
                    return Err(TypeError::format("ISO-8601 duration", input));
                }
                let value: f64 = number
                    .parse()
                    .map_err(|_| TypeError::format("ISO-8601 duration", input))?;
                number.clear();
                saw_component = true;
                match (in_time, unit.to_ascii_uppercase()) {
                    (false, 'Y') => years += value as i64,
                    (false, 'M') => months += value as i64,
                    (false, 'W') => days += (value as i64) * 7,
                    (false, 'D') => days += value as i64,
                    (true, 'H') => micros += (value * MICROS_PER_HOUR as f64) as i64,
                    (true, 'M') => micros += (value * MICROS_PER_MINUTE as f64) as i64,
                    (true, 'S') => micros += (value * MICROS_PER_SECOND as f64) as i64,
                    _ => return Err(TypeError::format("ISO-8601 duration", input)),
                }
            }
        }
    }
    if !number.is_empty() || !saw_component {
        return Err(TypeError::format("ISO-8601 duration", input));
    }
    let sign = if negate { -1 } else { 1 };
    Ok(ParsedIso {
        years: (years * sign) as i32,
        months: (months * sign) as i32,
        days: (days * sign) as i32,
        microseconds: micros * sign,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_interval_parse_full() {
        // The month field carries the M component as written; the year
        // component is the producer's to fold, never this parser's.
        let iv: PostgresInterval = "P1Y2M3DT4H5M6S".parse().unwrap();
        assert_eq!(iv.months, 2);
        assert_eq!(iv.days, 3);
        assert_eq!(
            iv.microseconds,
            4 * MICROS_PER_HOUR + 5 * MICROS_PER_MINUTE + 6 * MICROS_PER_SECOND
        );
    }

    #[test]
    fn test_postgres_interval_month_only_input() {
        // Producer-folded input arrives with months already combined.
        let iv: PostgresInterval = "P14M3D".parse().unwrap();
        assert_eq!(iv.months, 14);
        assert_eq!(iv.days, 3);
    }

    #[test]
    fn test_postgres_interval_display_roundtrip() {
        let iv = PostgresInterval::new(14, 3, 4 * MICROS_PER_HOUR + 5 * MICROS_PER_MINUTE);
        assert_eq!(iv.to_string(), "P14M3DT4H5M");
        let reparsed: PostgresInterval = iv.to_string().parse().unwrap();
        assert_eq!(iv, reparsed);
    }

    #[test]
    fn test_postgres_interval_lossy_zero_on_garbage() {
        assert_eq!(PostgresInterval::parse_lossy("not a duration"), PostgresInterval::ZERO);
        assert_eq!(PostgresInterval::parse_lossy(""), PostgresInterval::ZERO);
        assert_eq!(PostgresInterval::parse_lossy("P"), PostgresInterval::ZERO);
    }

    #[test]
    fn test_postgres_interval_fractional_seconds() {
        let iv: PostgresInterval = "PT0.5S".parse().unwrap();
        assert_eq!(iv.microseconds, 500_000);
        let reparsed: PostgresInterval = iv.to_string().parse().unwrap();
        assert_eq!(iv, reparsed);
    }

    #[test]
    fn test_year_month_roundtrip() {
        let iv = IntervalYearMonth::new(3, 7);
        assert_eq!(iv.to_iso(), "P3Y7M");
        let reparsed: IntervalYearMonth = iv.to_iso().parse().unwrap();
        assert_eq!(iv, reparsed);
        assert_eq!(iv.total_months(), 43);
    }

    #[test]
    fn test_year_month_rejects_time_part() {
        assert!("P1DT2H".parse::<IntervalYearMonth>().is_err());
    }

    #[test]
    fn test_day_second_roundtrip() {
        let iv = IntervalDaySecond::new(
            2,
            Duration::hours(4) + Duration::minutes(5) + Duration::seconds(6),
        );
        assert_eq!(iv.to_iso(), "P2DT4H5M6S");
        let reparsed: IntervalDaySecond = iv.to_iso().parse().unwrap();
        assert_eq!(iv, reparsed);
    }

    #[test]
    fn test_day_second_rejects_months() {
        assert!("P1M2D".parse::<IntervalDaySecond>().is_err());
        assert!("P1Y2D".parse::<IntervalDaySecond>().is_err());
    }

    #[test]
    fn test_year_month_normalises_overflow_months() {
        let iv: IntervalYearMonth = "P15M".parse().unwrap();
        assert_eq!((iv.years, iv.months), (1, 3));
        let combined: IntervalYearMonth = "P1Y15M".parse().unwrap();
        assert_eq!((combined.years, combined.months), (2, 3));
    }

    #[test]
    fn test_day_second_from_duration_splits_days() {
        let iv = IntervalDaySecond::from(Duration::hours(50));
        assert_eq!(iv.days, 2);
        assert_eq!(iv.microseconds, 2 * MICROS_PER_HOUR);
    }

    #[test]
    fn test_zero_forms() {
        assert_eq!(PostgresInterval::ZERO.to_string(), "PT0S");
        assert_eq!(IntervalYearMonth::ZERO.to_string(), "P0M");
        assert_eq!(IntervalDaySecond::ZERO.to_string(), "PT0S");
    }
}
