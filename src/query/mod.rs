pub mod field_path;
pub mod filter;
