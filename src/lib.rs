//! # UniVerse Canvas
//!
//! A blog and portfolio content server, usable both as a standalone binary
//! and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! universe-canvas = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use universe_canvas::content::{ContentService, LogRevalidator, RelatedConfig};
//! use universe_canvas::server::{AppState, create_router};
//! use universe_canvas::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/canvas.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let content = ContentService::new(
//!     Arc::new(store),
//!     Arc::new(LogRevalidator),
//!     RelatedConfig::default(),
//! );
//! let router = create_router(Arc::new(AppState::new(content, None)));
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `canvas` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
