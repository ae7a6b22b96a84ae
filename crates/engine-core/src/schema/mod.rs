pub mod audit;
pub mod coercion;
pub mod mapping;
