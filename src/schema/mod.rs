//! Schema module - Configuration and target path types.

mod config;
mod path;

pub use config::*;
pub use path::*;
