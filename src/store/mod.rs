//! Persistence Module
//!
//! Storage seams for definitions and instances, with in-memory
//! implementations.
//!
//! - [`definition`]: Definition lookup, create/update, and listing
//! - [`instance`]: Instance save/get and listing

pub mod definition;
pub mod instance;

pub use definition::{DefinitionFilter, DefinitionStore, DefinitionUpdate, InMemoryDefinitionStore};
pub use instance::{InMemoryInstanceStore, InstanceFilter, InstanceStore};
