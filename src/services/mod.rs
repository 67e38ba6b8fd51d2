pub mod binder;
pub mod classifier;
pub mod ingest;
pub mod resolver;

pub use binder::{Action, Binding, Settle};
pub use ingest::ingest_components;
pub use resolver::{resolve_components, Resolution};
