//! Type construction and compatibility errors

use thiserror::Error;

/// Errors produced while constructing or comparing types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A type could not be constructed (e.g. negative array length)
    #[error("invalid type: {message}")]
    InvalidType { message: String },

    /// A simple type name did not resolve to a known type
    #[error("unknown type name '{name}'")]
    UnknownTypeName { name: String },
}
