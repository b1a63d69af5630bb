//! Generic range values with the canonical `[a,b)` text form.

use core::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// A range over an ordered element type, mirroring PostgreSQL range types.
///
/// Bounds are optional; a missing bound is unbounded on that side. Canonical
/// text uses `[`/`]` for inclusive and `(`/`)` for exclusive bounds, with an
/// empty slot for an unbounded side: `[1,10)`, `(,5]`, `(,)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range<T> {
    /// Lower bound, unbounded when `None`.
    pub lower: Option<T>,
    /// Upper bound, unbounded when `None`.
    pub upper: Option<T>,
    /// Whether the lower bound is inclusive.
    pub lower_inclusive: bool,
    /// Whether the upper bound is inclusive.
    pub upper_inclusive: bool,
}

impl<T> Range<T> {
    /// Create a range with explicit bounds and inclusivity.
    #[must_use]
    pub fn new(
        lower: Option<T>,
        upper: Option<T>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self {
        Self {
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// The conventional half-open form `[lower, upper)`.
    #[must_use]
    pub fn half_open(lower: T, upper: T) -> Self {
        Self::new(Some(lower), Some(upper), true, false)
    }

    /// A fully unbounded range, `(,)`.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(None, None, false, false)
    }

    /// Whether both sides are unbounded.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

impl<T> From<(Option<T>, Option<T>)> for Range<T> {
    /// Tuple sources carry no inclusivity information; both sides default
    /// to open, matching the loose tuple inputs accepted from drivers.
    fn from((lower, upper): (Option<T>, Option<T>)) -> Self {
        Self::new(lower, upper, false, false)
    }
}

impl<T: PartialOrd> Range<T> {
    /// Whether the value falls inside this range.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(l) if self.lower_inclusive => value >= l,
            Some(l) => value > l,
        };
        let below_upper = match &self.upper {
            None => true,
            Some(u) if self.upper_inclusive => value <= u,
            Some(u) => value < u,
        };
        above_lower && below_upper
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.lower_inclusive { "[" } else { "(" })?;
        if let Some(l) = &self.lower {
            write!(f, "{l}")?;
        }
        f.write_str(",")?;
        if let Some(u) = &self.upper {
            write!(f, "{u}")?;
        }
        f.write_str(if self.upper_inclusive { "]" } else { ")" })
    }
}

impl<T: FromStr> FromStr for Range<T> {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let lower_inclusive = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(TypeError::format("range", s)),
        };
        let upper_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(TypeError::format("range", s)),
        };
        let body = &s[1..s.len() - 1];
        let (lower, upper) = body
            .split_once(',')
            .ok_or_else(|| TypeError::format("range", s))?;
        let parse_bound = |text: &str| -> Result<Option<T>, TypeError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<T>()
                .map(Some)
                .map_err(|_| TypeError::format("range bound", s))
        };
        Ok(Self::new(
            parse_bound(lower)?,
            parse_bound(upper)?,
            lower_inclusive,
            upper_inclusive,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_half_open_display() {
        let r = Range::half_open(1, 10);
        assert_eq!(r.to_string(), "[1,10)");
    }

    #[test]
    fn test_parse_forms() {
        let closed: Range<i32> = "[1,10]".parse().unwrap();
        assert!(closed.lower_inclusive && closed.upper_inclusive);

        let open_lower: Range<i32> = "(1,10]".parse().unwrap();
        assert!(!open_lower.lower_inclusive && open_lower.upper_inclusive);

        let unbounded: Range<i32> = "(,)".parse().unwrap();
        assert!(unbounded.is_unbounded());

        let half_unbounded: Range<i32> = "(,5]".parse().unwrap();
        assert_eq!(half_unbounded.lower, None);
        assert_eq!(half_unbounded.upper, Some(5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1,10".parse::<Range<i32>>().is_err());
        assert!("[1;10)".parse::<Range<i32>>().is_err());
        assert!("[a,b)".parse::<Range<i32>>().is_err());
    }

    #[test]
    fn test_contains() {
        let r = Range::half_open(1, 10);
        assert!(r.contains(&1));
        assert!(r.contains(&9));
        assert!(!r.contains(&10));
        assert!(!r.contains(&0));
    }

    #[test]
    fn test_tuple_source_defaults_open() {
        let r: Range<i64> = (Some(3i64), None).into();
        assert!(!r.lower_inclusive);
        assert!(!r.upper_inclusive);
        assert_eq!(r.to_string(), "(3,)");
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            lower in proptest::option::of(-1000i32..1000),
            upper in proptest::option::of(-1000i32..1000),
            li in any::<bool>(),
            ui in any::<bool>(),
        ) {
            let r = Range::new(lower, upper, li, ui);
            let reparsed: Range<i32> = r.to_string().parse().unwrap();
            prop_assert_eq!(r, reparsed);
        }
    }
}
