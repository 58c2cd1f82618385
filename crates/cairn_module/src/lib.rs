//! CAIRN Module
//!
//! Resolves a verified bucket into a module: the dependency pins from its
//! lock file plus its documentation and license text.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod loader;
pub mod lock;
pub mod module;
pub mod pin;

pub use config::LoaderConfig;
pub use error::{ModuleError, PinError};
pub use loader::ModuleLoader;
pub use lock::{LOCK_VERSION_V1, parse_lock};
pub use module::Module;
pub use pin::ModulePin;
