//! SQL standard compliance levels.

use core::fmt;

/// The SQL standard revision a live product is judged to honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SqlStandardLevel {
    /// SQL-89.
    Sql89,
    /// SQL-92, the conservative floor for unidentified products.
    Sql92,
    /// SQL:1999.
    Sql99,
    /// SQL:2003.
    Sql2003,
    /// SQL:2008.
    Sql2008,
    /// SQL:2011.
    Sql2011,
    /// SQL:2016.
    Sql2016,
}

impl SqlStandardLevel {
    /// Human-readable label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sql89 => "SQL-89",
            Self::Sql92 => "SQL-92",
            Self::Sql99 => "SQL:1999",
            Self::Sql2003 => "SQL:2003",
            Self::Sql2008 => "SQL:2008",
            Self::Sql2011 => "SQL:2011",
            Self::Sql2016 => "SQL:2016",
        }
    }
}

impl fmt::Display for SqlStandardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
