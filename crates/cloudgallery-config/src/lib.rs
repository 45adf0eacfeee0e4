#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]

//! Client configuration for CloudGallery front-ends.
//!
//! Layout: `model.rs` (typed config and the derived backend endpoint),
//! `defaults.rs` (default values), `loader.rs` (TOML file + environment
//! layering), `validate.rs` (field checks), `error.rs` (error type).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, default_config_path, load, load_with};
pub use model::{BackendEndpoint, ClientConfig, ConfigOverrides};
