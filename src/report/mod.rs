//! Report renderers for evidence scan results.
//!
//! - [`terminal`] — colored summary box plus evidence and failure tables.
//! - [`json`] — machine-readable dump of dependencies and failures.

pub mod json;
pub mod terminal;
