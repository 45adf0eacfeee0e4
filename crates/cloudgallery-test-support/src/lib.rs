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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (records, bitmaps, config), progress.rs (local WebSocket progress server).

pub mod fixtures;
pub mod progress;
