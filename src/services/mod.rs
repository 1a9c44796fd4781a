//! Request-scoped services over the storage ports

pub mod feature;
pub mod layer;

pub use feature::FeatureService;
pub use layer::LayerService;
