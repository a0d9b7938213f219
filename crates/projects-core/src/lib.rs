//! Projects Core — concurrent discovery of version-controlled project roots.
//!
//! This crate contains all discovery logic with zero CLI dependencies.
//! It is designed to be reusable across different frontends.
//!
//! # Modules
//!
//! - [`processor`] — Dynamic-fanout job processor with exact completion detection.
//! - [`walker`] — Directory walker that reports project roots and stops descending at them.
//! - [`sink`] — Lock-guarded accumulator for matches reported from many workers.
//! - [`model`] — The `Match` record shared by every layer.
//! - [`cache`] — Flat `name=path` cache file with an age-based staleness policy.
//! - [`lister`] — Live and cached project lists built on the walker and the cache.
pub mod cache;
pub mod lister;
pub mod model;
pub mod processor;
pub mod sink;
pub mod walker;

pub use model::Match;
