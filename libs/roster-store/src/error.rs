use thiserror::Error;

/// Errors a [`crate::RosterStore`] backend may surface. The host maps
/// these onto `shared_models::AppError::Collaborator` rather than failing
/// the request outright where §7 calls the store best-effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed settings payload for key {key}: {source}")]
    MalformedSettings {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
