//! Content hashing and mirror verification for treemirror.
//!
//! This crate provides:
//!
//! - **Content hashing** - streaming BLAKE3 digests with bounded memory
//! - **Mirror checks** - read-only comparison of two trees
//!
//! # Content Hashing
//!
//! ```rust,no_run
//! use treemirror_verify::ContentHasher;
//! use std::path::Path;
//!
//! let hasher = ContentHasher::new();
//! let digest = hasher.digest(Path::new("/data/archive.tar")).unwrap();
//! println!("{}", digest.to_hex());
//! ```
//!
//! # Mirror Checks
//!
//! ```rust,no_run
//! use treemirror_verify::{CheckConfig, MirrorCheck};
//! use std::path::Path;
//!
//! let config = CheckConfig::builder().deep(true).build().unwrap();
//! let report = MirrorCheck::with_config(config)
//!     .check(Path::new("/data/source"), Path::new("/data/replica"))
//!     .unwrap();
//!
//! for discrepancy in &report.discrepancies {
//!     println!("{discrepancy}");
//! }
//! ```

mod check;
mod hasher;

pub use check::{CheckConfig, CheckConfigBuilder, Discrepancy, MirrorCheck, MirrorReport};
pub use hasher::ContentHasher;

// Re-export core types
pub use treemirror_core::ContentHash;
