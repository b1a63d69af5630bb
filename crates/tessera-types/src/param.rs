//! The provider-neutral parameter model.

use crate::logical::{DbType, LogicalType};
use crate::value::DbValue;

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamDirection {
    /// Input only (the default).
    #[default]
    Input,
    /// Output only.
    Output,
    /// Both input and output.
    InputOutput,
    /// Stored-procedure return value.
    ReturnValue,
}

impl ParamDirection {
    /// Whether this direction consumes a slot of the dialect's
    /// output-parameter budget.
    #[must_use]
    pub fn counts_against_output_budget(self) -> bool {
        matches!(self, Self::Output | Self::InputOutput | Self::ReturnValue)
    }
}

/// A parameter in its provider-neutral form.
///
/// The mapping registry's configure callbacks refine this with provider
/// type codes, sizes, and UDT names before a driver materialises its native
/// parameter object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    /// Parameter name without any marker prefix. `None` until the owning
    /// container assigns a generated name.
    pub name: Option<String>,
    /// Direction.
    pub direction: ParamDirection,
    /// Generic wire-level type tag.
    pub db_type: DbType,
    /// Size hint (text lengths, binary capacities).
    pub size: Option<usize>,
    /// User-defined type name, for providers that dispatch on it
    /// (PostgreSQL composite/extension types, Oracle object types).
    pub udt_name: Option<String>,
    /// Raw provider-specific type code, when a mapping pinned one.
    pub provider_type_code: Option<i32>,
    /// Element type for array parameters.
    pub array_element: Option<LogicalType>,
    /// The bound value.
    pub value: DbValue,
}

impl Parameter {
    /// Create an input parameter with a name and value.
    #[must_use]
    pub fn input(name: impl Into<String>, db_type: DbType, value: DbValue) -> Self {
        Self {
            name: Some(name.into()),
            db_type,
            value,
            ..Self::default()
        }
    }

    /// Create an unnamed input parameter; the container assigns a name.
    #[must_use]
    pub fn anonymous(db_type: DbType, value: DbValue) -> Self {
        Self {
            db_type,
            value,
            ..Self::default()
        }
    }

    /// Set the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ParamDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Whether the bound value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_budget_classification() {
        assert!(!ParamDirection::Input.counts_against_output_budget());
        assert!(ParamDirection::Output.counts_against_output_budget());
        assert!(ParamDirection::InputOutput.counts_against_output_budget());
        assert!(ParamDirection::ReturnValue.counts_against_output_budget());
    }

    #[test]
    fn test_input_constructor() {
        let p = Parameter::input("p0", DbType::Int32, DbValue::Int32(7));
        assert_eq!(p.name.as_deref(), Some("p0"));
        assert_eq!(p.direction, ParamDirection::Input);
        assert!(!p.is_null());
    }

    #[test]
    fn test_anonymous_has_no_name() {
        let p = Parameter::anonymous(DbType::String, DbValue::Null);
        assert!(p.name.is_none());
        assert!(p.is_null());
    }
}
