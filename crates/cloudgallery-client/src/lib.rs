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
#![allow(clippy::module_name_repetitions)]

//! Client core for the CloudGallery photo service.
//!
//! Layout: `session.rs` (token lifecycle), `routes.rs` (route table, guard,
//! navigator), `api.rs` (HTTP client with centralised 401 handling),
//! `auth.rs`/`gallery.rs`/`detail.rs` (view state), `slideshow.rs` (autoplay
//! state machine and driver), `editor.rs` (crop and filter rendering),
//! `progress.rs`/`upload.rs` (upload flow and its progress channel),
//! `subscription.rs` (scoped task handles), `error.rs` (error type).

pub mod api;
pub mod auth;
pub mod detail;
pub mod editor;
pub mod error;
pub mod gallery;
pub mod progress;
pub mod routes;
pub mod session;
pub mod slideshow;
pub mod subscription;
pub mod upload;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
pub use routes::{GuardDecision, Navigator, Route, RouteGuard};
pub use session::{FileTokenStore, MemoryTokenStore, SessionContext, SessionEvent, TokenStore};
pub use subscription::Subscription;
