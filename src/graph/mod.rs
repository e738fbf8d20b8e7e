//! Discovery of the resource tree below an export root

pub mod builder;
pub mod collision;

pub use builder::{GraphBuilder, SkippedResource};
