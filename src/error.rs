use std::fmt;

/// Row-granular failures raised while reconciling raw export rows.
///
/// None of these abort a batch: a malformed option drops the offending
/// line, a malformed price or missing column drops the row, and an
/// unresolved reference nulls the field but keeps the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// The price token of a variant line (or a bare-price field) is not
    /// a plain integer.
    MalformedPrice { token: String },
    /// An attribute/value pair of a variant line is missing its `:`
    /// separator, or the line carries no pairs at all.
    MalformedOption { pair: String },
    /// A raw row lacks a value in a required column.
    MissingRequiredField { column: &'static str },
    /// A feedback or order row points at a product/variant that is not
    /// part of the reconciled catalog.
    UnresolvedReference { entity: &'static str, key: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::MalformedPrice { token } => {
                write!(f, "malformed price token {token:?}")
            }
            RowError::MalformedOption { pair } => {
                write!(f, "malformed option pair {pair:?}")
            }
            RowError::MissingRequiredField { column } => {
                write!(f, "missing required field {column:?}")
            }
            RowError::UnresolvedReference { entity, key } => {
                write!(f, "unresolved {entity} reference {key:?}")
            }
        }
    }
}

impl std::error::Error for RowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_input() {
        let err = RowError::MalformedPrice {
            token: "5,000".into(),
        };
        assert!(err.to_string().contains("5,000"));

        let err = RowError::UnresolvedReference {
            entity: "product",
            key: "42".into(),
        };
        assert!(err.to_string().contains("product"));
    }
}
