//! Command implementations

pub mod base;
pub mod create_pr;
pub mod list_prs;
pub mod repo;
pub mod tree;
pub mod validators;

pub use base::{Command, CommandContext};
pub use create_pr::CreatePrCommand;
pub use list_prs::ListPrsCommand;
pub use repo::RepoCommand;
pub use tree::TreeCommand;
