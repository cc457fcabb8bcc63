//! Compilation errors raised during lowering and optimization.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },

    #[error("internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::InternalError {
            message: message.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        CompileError::UnsupportedFeature {
            feature: feature.into(),
        }
    }
}
