//! # Railgen
//!
//! A generator for Responsible AI Licenses (RAIL): a catalog of use
//! restrictions grouped by domain, licenses assembled from them, and
//! rendered documents in several formats. Usable both as a standalone
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! railgen = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use railgen::license::TemplateStore;
//! use railgen::server::{AppState, create_router};
//! use railgen::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/railgen.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     TemplateStore::new("./templates"),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `railgen` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod license;
pub mod server;
pub mod store;
pub mod types;
