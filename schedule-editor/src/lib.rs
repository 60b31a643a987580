//! Transit schedule editor.
//!
//! Applies line-oriented edit commands to a transit schedule that runs on a
//! road or rail network: rerouting a route through a different link, and
//! moving stops to the child facility of the same stop on another link.
//! Affected link sequences are rebuilt with a least-cost router per
//! transport mode.

pub mod config;
pub mod domain;
pub mod editor;
pub mod error;
pub mod registry;
pub mod rewrite;
pub mod routing;
pub mod scenario;

#[cfg(test)]
mod fixtures;
