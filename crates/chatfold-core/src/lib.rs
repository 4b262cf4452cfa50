//! Shared types, configuration, and the deduplication core for chatfold.

pub mod config;
pub mod index;
pub mod model;
pub mod normalize;
pub mod util;

pub use config::*;
pub use index::*;
pub use model::*;
pub use normalize::*;
pub use util::log_snippet;
