//! Head branch naming

use crate::constants::cli::{DEFAULT_BRANCH_PREFIX, UUID_LENGTH};
use uuid::Uuid;

/// `<prefix>-<6 hex chars>`, with the default prefix when none is given
pub fn generate_branch_name(prefix: Option<&str>) -> String {
    format!(
        "{}-{}",
        prefix.unwrap_or(DEFAULT_BRANCH_PREFIX),
        &Uuid::new_v4().simple().to_string()[..UUID_LENGTH]
    )
}
