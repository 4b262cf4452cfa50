//! Session runtime for chatfold: transcript observation, ordered ingest,
//! and render-command emission.

pub mod extract;
pub mod feed;
pub mod render;
pub mod runtime_config;
pub mod session;
pub mod shutdown_signal;
