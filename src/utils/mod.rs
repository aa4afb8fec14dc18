//! Utility modules for common functionality

pub mod branch;
pub mod files;

pub use branch::generate_branch_name;
pub use files::{collect_dir, parse_file_mapping, read_file_mapping};
