//! Lenient `deserialize_with` helpers for sidecar documents.
//!
//! Export tools are inconsistent about types, so every helper here maps an
//! unexpected value to `None` instead of failing the whole document.

pub mod float;
pub mod object;
pub mod string;
