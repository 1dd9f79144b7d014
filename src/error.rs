//! Error types for the import run.

use thiserror::Error;

/// Any fault that ends an import run.
///
/// Row-level business rejections are not errors; they surface as
/// [`crate::models::ImportResult::Rejected`] instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The endpoint could not be reached or the exchange broke mid-flight.
    #[error("cannot reach {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered `authenticate` with a falsy identity.
    #[error("authentication rejected for user '{username}' on database '{database}'")]
    Authentication { database: String, username: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("{url} answered HTTP {status}")]
    Http { url: String, status: u16 },

    /// The remote raised an XML-RPC fault.
    #[error("remote fault {code}: {message}")]
    Fault { code: String, message: String },

    /// The response was not a well-formed XML-RPC document.
    #[error("malformed XML-RPC payload: {0}")]
    Protocol(String),

    /// The response was well-formed but not the shape the call promises.
    #[error("unexpected result from {method}: {value}")]
    UnexpectedResponse { method: String, value: String },

    /// A row was declined while running with `stop_on_rejection`.
    #[error("customer '{name}' (row {row}) was rejected and stop-on-rejection is set")]
    Rejected { row: usize, name: String },

    /// The CSV input could not be read.
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// The CSV header lacks a column the field mapping needs.
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: String, column: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let err = ImportError::Authentication {
            database: "prod".to_string(),
            username: "admin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authentication rejected for user 'admin' on database 'prod'"
        );

        let err = ImportError::MissingColumn {
            path: "customers.csv".to_string(),
            column: "email".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "customers.csv is missing required column 'email'"
        );
    }
}
