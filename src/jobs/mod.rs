pub mod definition;
pub mod loader;
pub mod registry;
