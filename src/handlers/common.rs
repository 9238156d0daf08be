use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::services::category_service::CategoryError;
use crate::services::ip_security_service::IpSecurityError;

/// The signed-in user on whose behalf a handler runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
}

impl SessionUser {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Error response structure.
///
/// `message` is short and user-facing; it names the action that was blocked
/// and never carries storage internals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    /// No signed-in user for an action that needs one
    pub fn session_required(action: &str) -> Self {
        Self::new(
            "session_required",
            &format!("Could not {}: please sign in again", action),
        )
    }

    /// Flatten validator output into one readable message
    pub fn validation(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let messages: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::new("validation_error", &fields.join("; "))
    }

    pub fn from_category_error(action: &str, err: &CategoryError) -> Self {
        let (error_type, reason) = match err {
            CategoryError::NoUserId => ("no_user_id", "please sign in again"),
            CategoryError::NotFound => ("category_not_found", "category not found"),
            CategoryError::Forbidden => (
                "forbidden",
                "you are not allowed to edit this category",
            ),
            CategoryError::SaveFailed(_) => ("save_failed", "changes could not be saved"),
        };

        Self::new(error_type, &format!("Could not {}: {}", action, reason))
    }

    pub fn from_ip_security_error(action: &str, err: &IpSecurityError) -> Self {
        let (error_type, reason) = match err {
            IpSecurityError::NoUserId => ("no_user_id", "please sign in again"),
            IpSecurityError::NotFound => ("ip_record_not_found", "no login history yet"),
            IpSecurityError::PersistenceReadFailed(_) => {
                ("read_failed", "login history could not be read")
            }
            IpSecurityError::SaveFailed(_) => ("save_failed", "login history could not be saved"),
        };

        Self::new(error_type, &format!("Could not {}: {}", action, reason))
    }
}
