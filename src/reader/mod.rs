pub mod forward;
pub mod log_file;
pub mod reverse;
