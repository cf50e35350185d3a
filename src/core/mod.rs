//! Core business logic modules

pub mod ranking;

// Re-export commonly used types
pub use ranking::rank;
