//! Backends module - Filesystem access
//!
//! Provides:
//! - scan: File discovery with the ignore crate

pub mod scan;
