//! libris application library
//!
//! Feature modules for the catalog service. The binary and the CLI both
//! register them through [`modules::register_all`].

pub mod modules;

pub use modules::*;
