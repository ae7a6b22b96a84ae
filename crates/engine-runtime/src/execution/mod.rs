pub mod executor;
pub mod pipeline;
pub mod summary;
pub mod workers;
