//! Palaver cache subsystem.
//!
//! A read-through cache over listing and entity queries, kept coherent by
//! the change-capture router:
//!
//! - **Store**: LRU-bounded map with per-entry TTLs and wildcard deletes
//! - **Facade**: serialize/deserialize plus single-flight on misses
//! - **Router**: per-collection change streams driving invalidation
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `palaver.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 4096
//! feed_ttl_secs = 60
//! # ... see config.rs for all options
//! ```

mod config;
mod events;
mod facade;
mod invalidation;
pub mod keys;
mod lock;
mod router;
mod store;

pub use config::{CacheConfig, TtlClass};
pub use events::{ChangeEvent, ChangedRefs, PayloadError};
pub use facade::ReadThroughCache;
pub use invalidation::invalidation_patterns;
pub use router::{CaptureConfig, ChangeCaptureRouter, spawn_sweeper};
pub use store::{CacheStore, pattern_matches};
