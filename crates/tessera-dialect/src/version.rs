//! Database product version handling.

use core::fmt;
use std::str::FromStr;

/// A parsed product version: `major.minor[.build[.revision]]`.
///
/// Ordering compares components left to right with missing components
/// treated as zero, so `15.4` sorts below `15.4.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DbVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Build component, when the banner carried one.
    pub build: Option<u32>,
    /// Revision component, when the banner carried one.
    pub revision: Option<u32>,
}

impl DbVersion {
    /// Create a two-component version.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Create a version with all four components.
    #[must_use]
    pub const fn full(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// Whether this version is at least `major.minor`.
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    fn key(&self) -> (u32, u32, u32, u32) {
        (
            self.major,
            self.minor,
            self.build.unwrap_or(0),
            self.revision.unwrap_or(0),
        )
    }
}

impl PartialOrd for DbVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DbVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for DbVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DbVersion {
    type Err = ();

    /// Parses a bare dotted version, up to four components. Anything that
    /// is not `digits(.digits){1,3}` fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or(())?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or(())?;
        let build = match parts.next() {
            Some(p) => Some(p.parse().map_err(|_| ())?),
            None => None,
        };
        let revision = match parts.next() {
            Some(p) => Some(p.parse().map_err(|_| ())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Self {
            major,
            minor,
            build,
            revision,
        })
    }
}

/// Extract the first dotted version token from free-form banner text.
///
/// Used by dialects whose banners embed the version in prose
/// (`PostgreSQL 15.4 on x86_64-pc-linux-gnu, ...`). Returns `None` when no
/// `N.N[.N[.N]]` token is present.
#[must_use]
pub fn extract_version_token(banner: &str) -> Option<DbVersion> {
    static TOKEN: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        #[allow(clippy::expect_used)]
        regex::Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid regex")
    });
    let caps = TOKEN.captures(banner)?;
    let get = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    Some(DbVersion {
        major: get(1)?,
        minor: get(2)?,
        build: get(3),
        revision: get(4),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_components() {
        let v: DbVersion = "15.4".parse().unwrap();
        assert_eq!((v.major, v.minor), (15, 4));
        assert_eq!(v.build, None);

        let v: DbVersion = "15.0.2000.5".parse().unwrap();
        assert_eq!(v.revision, Some(5));
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert!("15".parse::<DbVersion>().is_err());
        assert!("a.b".parse::<DbVersion>().is_err());
        assert!("1.2.3.4.5".parse::<DbVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        let base: DbVersion = "15.4".parse().unwrap();
        let patched: DbVersion = "15.4.1".parse().unwrap();
        assert!(base < patched);
        assert!(DbVersion::new(16, 0) > patched);
    }

    #[test]
    fn test_at_least() {
        let v = DbVersion::new(3, 35);
        assert!(v.at_least(3, 35));
        assert!(v.at_least(3, 34));
        assert!(!v.at_least(3, 36));
        assert!(!v.at_least(4, 0));
    }

    #[test]
    fn test_extract_from_banner() {
        let v = extract_version_token("PostgreSQL 15.4 on x86_64-pc-linux-gnu").unwrap();
        assert_eq!((v.major, v.minor), (15, 4));

        assert!(extract_version_token("no digits here").is_none());
    }

    #[test]
    fn test_display_roundtrip() {
        let v = DbVersion::full(15, 0, 2000, 5);
        assert_eq!(v.to_string(), "15.0.2000.5");
        let reparsed: DbVersion = v.to_string().parse().unwrap();
        assert_eq!(v, reparsed);
    }
}
