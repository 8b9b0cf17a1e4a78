//! Task schema: column vocabulary, wired accessors and model registry.

pub mod model;
pub mod registry;
pub mod tasks;

pub use model::{TaskModel, LOCAL_ACCOUNT_TYPE};
pub use registry::{ModelRegistry, ModelRegistryError};
