pub mod indexes;
pub mod metrics;
pub mod store;
