use thiserror::Error;

use challenger_core_types::AuthorityId;

use crate::lifecycle::RecipeStatus;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("No recipe exists for authority `{0}`")]
    NotFound(AuthorityId),

    #[error("A recipe already exists for authority `{0}`")]
    AlreadyExists(AuthorityId),

    #[error("Invalid status transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: RecipeStatus,
        to: RecipeStatus,
    },

    #[error("Invalid step ordering: {0}")]
    InvalidStepOrder(String),

    #[error("Recipe storage failed: {0}")]
    Storage(String),
}

impl From<std::io::Error> for RecipeError {
    fn from(err: std::io::Error) -> Self {
        RecipeError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RecipeError {
    fn from(err: serde_json::Error) -> Self {
        RecipeError::Storage(err.to_string())
    }
}
