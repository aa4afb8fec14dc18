//! Central constants for gitpr

/// Provider names accepted by the factory
pub mod providers {
    pub const GITHUB: &str = "github";
    pub const GITLAB: &str = "gitlab";
    pub const BITBUCKET_SERVER: &str = "bitbucket-server";
    pub const AZURE_DEVOPS: &str = "azure-devops";

    pub const ALL: [&str; 4] = [GITHUB, GITLAB, BITBUCKET_SERVER, AZURE_DEVOPS];
}

/// Defaults applied by providers during setup
pub mod defaults {
    /// Bitbucket Server user name when none is configured
    pub const BITBUCKET_USERNAME: &str = "git";

    pub const AZURE_HOSTNAME: &str = "dev.azure.com";

    /// Token type passed by `with_oauth2_token`
    pub const OAUTH2_TOKEN_TYPE: &str = "oauth2";

    /// Message of the commit that clears pre-existing files on GitLab
    pub const DELETE_OLD_FILES_MESSAGE: &str = "Delete old files for resources";
}

/// Environment variables tokens fall back to
pub mod env {
    pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
    pub const GITLAB_TOKEN: &str = "GITLAB_TOKEN";
    pub const BITBUCKET_TOKEN: &str = "BITBUCKET_TOKEN";
    pub const AZURE_DEVOPS_TOKEN: &str = "AZURE_DEVOPS_TOKEN";
}

/// Defaults for the command line
pub mod cli {
    /// Default configuration file name
    pub const DEFAULT_CONFIG_FILE: &str = "gitpr.yaml";

    /// Prefix of generated head branch names
    pub const DEFAULT_BRANCH_PREFIX: &str = "gitpr";

    /// Length of the UUID suffix used in generated branch names
    pub const UUID_LENGTH: usize = 6;

    pub const DEFAULT_COMMIT_MSG: &str = "Update files";
}
