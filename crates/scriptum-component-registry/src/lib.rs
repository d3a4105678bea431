mod error;
mod memory;
mod registry;

pub use error::RegistryError;
pub use memory::MemoryComponentRegistry;
pub use registry::{Component, ComponentRegistry, Scope};
