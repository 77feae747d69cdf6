//! # HTTP Handlers

pub mod callback;
pub mod health;
pub mod tasks;
