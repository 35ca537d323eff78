//! Shared building blocks

/// Watch-backed values published by the dispatcher
pub mod property;

pub use property::Property;
