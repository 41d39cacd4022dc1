//! Error types for query building and execution.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Unknown filter operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Cannot join '{table}': no join resolver configured")]
    NoJoinResolver { table: String },

    #[error("No relationship between '{from}' and '{to}'")]
    NoRelationship { from: String, to: String },

    #[error("Cannot load relation '{relation}': no related loader configured")]
    NoRelatedLoader { relation: String },

    /// Failure raised by the storage engine or another collaborator
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::UnknownOperator {
            field: "age".to_string(),
            operator: "$between".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown filter operator '$between' on field 'age'"
        );

        let err = QueryError::NoRelationship {
            from: "users".to_string(),
            to: "tags".to_string(),
        };
        assert_eq!(err.to_string(), "No relationship between 'users' and 'tags'");
    }

    #[test]
    fn test_execution_error_is_unmodified() {
        let err: QueryError = anyhow::anyhow!("no such table: users").into();
        assert_eq!(err.to_string(), "no such table: users");
    }
}
