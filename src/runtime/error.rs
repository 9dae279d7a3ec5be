use thiserror::Error;

use super::exception::{NO_CLASS_DEF_FOUND_ERROR, NO_SUCH_FIELD_ERROR, NO_SUCH_METHOD_ERROR};

/// A symbol could not be resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("method not found: {owner}.{name}{signature}")]
    MethodNotFound {
        owner: String,
        name: String,
        signature: String,
    },
    #[error("field not found: {owner}.{name}:{signature}")]
    FieldNotFound {
        owner: String,
        name: String,
        signature: String,
    },
}

impl ResolutionError {
    /// The exception the interpreter raises for the same failure.
    pub fn guest_exception_class(&self) -> &'static str {
        match self {
            ResolutionError::ClassNotFound(_) => NO_CLASS_DEF_FOUND_ERROR,
            ResolutionError::MethodNotFound { .. } => NO_SUCH_METHOD_ERROR,
            ResolutionError::FieldNotFound { .. } => NO_SUCH_FIELD_ERROR,
        }
    }

    /// Message carried by the guest exception.
    pub fn guest_message(&self) -> &str {
        match self {
            ResolutionError::ClassNotFound(name) => name,
            ResolutionError::MethodNotFound { name, .. } => name,
            ResolutionError::FieldNotFound { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value is not an instance of {target}")]
pub struct CastError {
    pub target: String,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("runtime is already initialized")]
    AlreadyInitialized,
    #[error("well-known class {0} is missing")]
    MissingClass(&'static str),
    #[error("well-known singleton {owner}.{field} is missing")]
    MissingSingleton {
        owner: &'static str,
        field: &'static str,
    },
}

/// Stop executing the current method: a guest exception is pending on the
/// calling thread.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unwind {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Cast(#[from] CastError),
    #[error("guest exception pending")]
    Pending,
}

pub type UnwindResult<T> = ::std::result::Result<T, Unwind>;
