//! Error types for quarry

use thiserror::Error;

/// Result type alias for quarry operations
pub type QuarryResult<T> = Result<T, QuarryError>;

/// Error types for data-access operations
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Bad or incomplete connection profile, unsupported driver, unreachable host
    #[error("Connection error: {0}")]
    Connection(String),

    /// Switching to (or using) a connection name that was never registered
    #[error("Unknown connection: '{0}' was not added")]
    UnknownConnection(String),

    /// The table does not exist in the target schema
    #[error("Unknown table: '{0}' does not exist")]
    UnknownTable(String),

    /// Bad operator, direction, limit/offset, bounds, or a forbidden statement fragment
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Mixed placeholder styles or binds that do not match the placeholders
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// The statement failed while executing
    #[error("Error executing '{method}()': {message}")]
    Execution { method: String, message: String },

    /// Configuration file could not be read, parsed or expanded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cached payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl QuarryError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a malformed query error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedQuery(message.into())
    }

    /// Create an execution error attributed to the builder method that issued it
    pub fn execution(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is a malformed query error
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedQuery(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is an unknown table error
    pub fn is_unknown_table(&self) -> bool {
        matches!(self, Self::UnknownTable(_))
    }

    /// Check if this is an unknown connection error
    pub fn is_unknown_connection(&self) -> bool {
        matches!(self, Self::UnknownConnection(_))
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for QuarryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for QuarryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
