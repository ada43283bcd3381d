pub mod enrich;
pub mod normalize;
pub mod processor;
