//! Core traits, settings and the module registry shared by every lpt-event crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
