//! Contracts for the external extraction capabilities.
//!
//! Every tool docsift shells out to, or wraps from a library, sits behind one
//! of these traits so passes can be exercised against fakes.

mod capability;

pub use capability::*;
