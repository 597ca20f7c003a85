#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! TOML-backed configuration for the tape bridge.
//!
//! Layout: `model.rs` (typed config model and defaults), `loader.rs`
//! (file/string loading), `validate.rs` (validation pass).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, parse_config};
pub use model::{BridgeConfig, SchedulingStrategy};
pub use validate::validate;
