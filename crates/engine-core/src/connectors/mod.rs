pub mod loader;
pub mod resolver;
