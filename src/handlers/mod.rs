//! HTTP handlers

pub mod extract;
pub mod health;
pub mod auth;
pub mod layers;
