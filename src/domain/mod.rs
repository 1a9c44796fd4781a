//! Feature domain: geometry codec, bbox parsing, partition registry,
//! result projection and the error taxonomy they share.

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod registry;

pub use bbox::Bbox;
pub use error::{FeatureError, FeatureResult};
pub use registry::StoragePartition;
