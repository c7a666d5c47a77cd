//! lpt-event: an events catalog served over HTTP and backed by a managed
//! Postgres instance with rotating credentials.

pub mod modules;
pub mod runtime;

pub use runtime::Runtime;
