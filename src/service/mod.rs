use std::fmt;

pub mod comments;
pub mod config;
pub mod credentials;
pub mod identity;
pub mod otp;
pub mod password;
pub mod posts;
pub mod tokens;

#[cfg(test)]
pub(crate) mod test_support;

/// Failure taxonomy shared by the domain services. Every variant is terminal
/// for the current request; nothing below the transport retries.
#[derive(Debug, PartialEq)]
pub enum ServiceError {
    /// Client input is malformed or violates policy; scoped to one field.
    Validation {
        field: &'static str,
        message: String,
    },
    /// Credential check failed. Deliberately carries no detail: an unknown
    /// identifier and a wrong password produce the same value.
    AuthFailure,
    NotFound,
    Internal(String),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation { field, message } => {
                write!(f, "validation failed on {}: {}", field, message)
            }
            ServiceError::AuthFailure => write!(f, "invalid credentials"),
            ServiceError::NotFound => write!(f, "not found"),
            ServiceError::Internal(detail) => write!(f, "internal error: {}", detail),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(err: sea_orm::DbErr) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
