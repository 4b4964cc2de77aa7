//! Utilities
//!
//! Small types used throughout the crate.

mod name;
mod position;

pub use name::QualifiedName;
pub use position::Position;
