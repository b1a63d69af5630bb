//! Row-version (timestamp) concurrency tokens.

use core::fmt;

use bytes::Bytes;

use crate::error::TypeError;

/// An opaque 8-byte row-version token (SQL Server `rowversion`, informix
/// style serial stamps). Compared bytewise; the big-endian integer form is
/// exposed for drivers that surface the counter as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RowVersion([u8; 8]);

impl RowVersion {
    /// Create a row version from exactly 8 bytes.
    ///
    /// # Errors
    ///
    /// Any other length is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 8] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            what: "row version",
            expected: "8 bytes",
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Create a row version from a counter value, encoded big-endian.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// The raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// The token interpreted as a big-endian counter.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// The token as an owned [`Bytes`] payload for parameter binding.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }
}

impl fmt::Display for RowVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for b in self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl From<u64> for RowVersion {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<i64> for RowVersion {
    fn from(value: i64) -> Self {
        Self::from_u64(value as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_exact() {
        let rv = RowVersion::from_bytes(&[0, 0, 0, 0, 0, 0, 0, 9]).unwrap();
        assert_eq!(rv.as_u64(), 9);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(RowVersion::from_bytes(&[1, 2, 3]).is_err());
        assert!(RowVersion::from_bytes(&[0; 16]).is_err());
        assert!(RowVersion::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_big_endian_integer_form() {
        let rv = RowVersion::from_u64(0x0102_0304_0506_0708);
        assert_eq!(rv.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(RowVersion::from(0x10u64).as_u64(), 0x10);
    }

    #[test]
    fn test_ordering_matches_counter() {
        assert!(RowVersion::from_u64(2) > RowVersion::from_u64(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(RowVersion::from_u64(255).to_string(), "0x00000000000000FF");
    }
}
