// src/watch/mod.rs

//! Filesystem watching.
//!
//! Wires a cross-platform `notify` watcher onto the configured roots and
//! turns change notifications into root-relative `RuntimeEvent::PathChanged`
//! events. It does **not** know about rules or the pipeline; classification
//! happens in the core.

pub mod watcher;

pub use watcher::{WatcherHandle, spawn_watcher};
