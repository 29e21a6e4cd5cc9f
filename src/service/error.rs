use crate::repository::error::RepositoryError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Invalid street id {street_id}.")]
    InvalidStreetId { street_id: i64 },

    #[error("Street name cannot be empty.")]
    EmptyStreetName,

    #[error("Invalid building `{building}`. Expected a number with an optional letter, e.g. 13 or 13-А.")]
    InvalidBuilding { building: String },

    #[error("RepositoryError: {0}")]
    RepositoryError(#[from] RepositoryError),
}
