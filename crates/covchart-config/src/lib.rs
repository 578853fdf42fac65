//! # covchart config
//!
//! Configuration schema, defaults, loading and validation.
//!
//! Configuration comes from a YAML or TOML file (or built-in defaults),
//! adjusted by `COVCHART_*` environment variables and validated before the
//! pipeline starts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;

pub use defaults::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
