//! gospelway library
//!
//! Offline-first access to the daily Gospel content: a retrying content client,
//! a TTL cache over a pluggable key-value store, and the saved highlights list.

pub mod app;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod highlights;
pub mod render;
