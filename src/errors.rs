//! Possible errors encountered by the tracing hook.

/// Errors related to the carrier side table.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A metadata carrier is already attached to the connection.
    ///
    /// Error parameters:
    ///
    /// - Identity of the connection that caused the error.
    #[error("a metadata carrier is already attached to connection {0}")]
    AlreadyAttached(u64),

    /// No metadata carrier is attached to the connection.
    ///
    /// Error parameters:
    ///
    /// - Identity of the connection that caused the error.
    #[error("no metadata carrier is attached to connection {0}")]
    CarrierMissing(u64),
}

/// Unrecognised database component code.
#[derive(Debug, thiserror::Error)]
#[error("unrecognised database component code {code}")]
pub struct ComponentParseError {
    code: i32,
}

impl From<i32> for ComponentParseError {
    fn from(code: i32) -> Self {
        ComponentParseError { code }
    }
}
