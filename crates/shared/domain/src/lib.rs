//! # Domain
//!
//! Plain data shared by every slice: configuration, constants and the registry of
//! initialized features. The only dependency is `serde`; no I/O lives here.

pub mod config;
pub mod constants;
pub mod registry;
