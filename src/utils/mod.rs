// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;
pub mod pool;
pub mod url;

pub use pool::PoolHandle;
