//! Shared CLI utilities

pub mod progress;
