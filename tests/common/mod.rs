#![allow(dead_code)] // Each integration test binary uses a subset of the helpers

pub mod builders;
pub mod recording_store;
pub mod scripted_backend;
pub mod strategies;

pub use builders::*;
pub use recording_store::*;
pub use scripted_backend::*;
