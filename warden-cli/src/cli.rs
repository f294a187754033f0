//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage and query Warden access policies", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create the rule table and seed configured roles
    Init,

    /// Add a permission rule
    Allow {
        subject: String,
        object: String,
        action: String,
    },

    /// Remove a permission rule
    Disallow {
        subject: String,
        object: String,
        action: String,
    },

    /// Assign a subject to a role
    Grant { subject: String, role: String },

    /// Remove a subject from a role
    Revoke { subject: String, role: String },

    /// Delete a role with all of its permissions and memberships
    DeleteRole { role: String },

    /// Decide a request; exits with status 1 on deny
    Check {
        subject: String,
        object: String,
        action: String,
    },

    /// Show the roles and permissions of a subject
    Roles {
        subject: String,

        /// Output format: text, json
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: String,
    },

    /// Issue an identity token
    IssueToken {
        subject: String,

        /// Token lifetime; defaults to the configured ttl
        #[arg(long, value_name = "SECONDS")]
        ttl_seconds: Option<i64>,
    },

    /// Verify an identity token and print its subject
    VerifyToken { token: String },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Validate the configuration in use
    Validate,

    /// Print a sample configuration file
    Sample,
}
