//! Configuration module for mdconv
//!
//! This module holds the conversion options and dialect definitions,
//! including deserialization from JSON/TOML files and loading of the
//! link remap side file.

mod options;
mod persistence;

pub use options::*;
pub use persistence::*;
