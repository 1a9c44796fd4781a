//! Data models

pub mod layer;
pub mod user;
pub mod feature;

pub use layer::*;
pub use user::*;
pub use feature::*;
