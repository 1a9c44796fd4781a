//! Feature domain errors

use thiserror::Error;
use uuid::Uuid;

pub type FeatureResult<T> = Result<T, FeatureError>;

/// Every failure the feature core can report.
///
/// The HTTP layer maps these 1:1 onto status codes; none of them are retried.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("layer {0} not found")]
    LayerNotFound(Uuid),

    #[error("feature {0} not found")]
    FeatureNotFound(Uuid),

    /// The layer points at a storage table the registry does not know,
    /// or at a table holding a different geometry type.
    #[error("no storage mapping for layer: {0}")]
    UnknownStorageMapping(String),

    #[error("feature {feature_id} is at version {current_version}, request expected {request_version}")]
    VersionMismatch {
        feature_id: Uuid,
        request_version: i32,
        current_version: i32,
    },

    #[error("geometry type '{actual}' does not match layer geometry type '{expected}'")]
    GeometryTypeMismatch { expected: String, actual: String },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("malformed bbox: {0}")]
    MalformedBbox(String),

    #[error("either geometry or properties must be supplied")]
    NoChangesSupplied,

    #[error("stored geometry cannot be decoded: {0}")]
    CorruptStoredGeometry(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
