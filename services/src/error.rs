use sea_orm::DbErr;
use std::fmt::Display;
use validator::ValidationErrors;

/// Errors surfaced by every service operation.
///
/// None of these are fatal; a failed operation leaves prior state untouched.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input, e.g. an empty name.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The operation is illegal for the entity's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The actor's role does not allow the attempted transition.
    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Message safe to show in the UI. Database details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound { entity, .. } => format!("{entity} not found"),
            Self::InvalidState(msg) => msg.clone(),
            Self::Permission(msg) => msg.clone(),
            Self::Database(err) => {
                tracing::error!("Database error surfaced to user: {err}");
                "Something went wrong, please try again".to_string()
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(common::format_validation_errors(&errors))
    }
}
