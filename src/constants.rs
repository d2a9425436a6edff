//! Span tag vocabulary and database component identifiers.
use std::convert::TryFrom;

use crate::errors::ComponentParseError;

/// Tag key for the protocol family of the traced call.
pub const TAG_DB_TYPE: &str = "db.type";

/// Tag key for the database instance (database name) the call targets.
pub const TAG_DB_INSTANCE: &str = "db.instance";

/// Tag key for the statement text of the traced call.
pub const TAG_DB_STATEMENT: &str = "db.statement";

/// Protocol family reported for all SQL connection calls.
///
/// This is distinct from the vendor tag carried by the connection metadata
/// (for example "mysql"), which shapes the operation name instead.
pub const DB_TYPE_SQL: &str = "sql";

/// Operation name infix between the vendor tag and the intercepted method.
pub const OPERATION_INFIX: &str = "/JDBI/Connection/";

/// Intercepted name of the connection close method.
pub const METHOD_CLOSE: &str = "close";

/// Intercepted name of the transaction commit method.
pub const METHOD_COMMIT: &str = "commit";

/// Intercepted name of the transaction rollback method.
pub const METHOD_ROLLBACK: &str = "rollback";

/// Intercepted name of the savepoint release method.
pub const METHOD_RELEASE_SAVEPOINT: &str = "releaseSavepoint";

/// Known database components a connection can talk to.
///
/// Numeric codes match the component vocabulary collectors already know.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum ComponentKind {
    Unknown = 0,
    H2 = 4,
    Mysql = 5,
    Oracle = 6,
    Postgresql = 22,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Unknown => write!(f, "Unknown"),
            ComponentKind::H2 => write!(f, "H2"),
            ComponentKind::Mysql => write!(f, "Mysql"),
            ComponentKind::Oracle => write!(f, "Oracle"),
            ComponentKind::Postgresql => write!(f, "PostgreSQL"),
        }
    }
}

impl TryFrom<i32> for ComponentKind {
    type Error = ComponentParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = match value {
            0 => ComponentKind::Unknown,
            4 => ComponentKind::H2,
            5 => ComponentKind::Mysql,
            6 => ComponentKind::Oracle,
            22 => ComponentKind::Postgresql,
            value => return Err(ComponentParseError::from(value)),
        };
        Ok(value)
    }
}
