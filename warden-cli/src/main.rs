use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

use warden_config::{ConfigLoader, WardenConfig};
use warden_logging::{init_logging_from_config, init_simple_tracing};
use warden_rbac::{Enforcer, RbacConfig, RoleManager, SeaOrmPolicyStore, TokenService};

mod cli;
use cli::{Cli, Commands, ConfigCommands};

/// Load configuration from file or environment
fn load_config(config_path: Option<&PathBuf>, log_level: Option<&String>) -> Result<WardenConfig> {
    let loader = ConfigLoader::new();

    let mut config = loader.load(config_path).with_context(|| match config_path {
        Some(path) => format!("Failed to load configuration from {:?}", path),
        None => "Failed to load configuration from environment".to_string(),
    })?;

    if let Some(level) = log_level {
        config.logging.level = level.parse().map_err(anyhow::Error::msg)?;
    }

    Ok(config)
}

/// Connect the policy store and build an enforcer over it
async fn build_enforcer(config: &WardenConfig) -> Result<Enforcer> {
    let store = SeaOrmPolicyStore::connect(&config.database)
        .await
        .context("Failed to open policy store")?;
    let enforcer = Enforcer::new(Arc::new(store), RbacConfig::from(config)).await?;
    Ok(enforcer)
}

fn print_outcome(changed: u64, done: &str, noop: &str) {
    if changed > 0 {
        println!("{} ({} rules)", done, changed);
    } else {
        println!("{}", noop);
    }
}

async fn handle_roles(enforcer: &Enforcer, subject: &str, format: &str) -> Result<()> {
    let direct = enforcer.roles_for_subject(subject).await;
    let implicit = enforcer.implicit_roles_for_subject(subject).await;
    let mut permissions = enforcer.permissions_for_subject(subject).await;
    for role in &implicit {
        permissions.extend(enforcer.permissions_for_subject(role).await);
    }

    match format.to_lowercase().as_str() {
        "json" => {
            let output = serde_json::json!({
                "subject": subject,
                "roles": direct,
                "implicit_roles": implicit,
                "permissions": permissions,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize to JSON")?
            );
        }
        "text" => {
            println!("subject: {}", subject);
            println!("roles: {}", direct.join(", "));
            println!("implicit roles: {}", implicit.join(", "));
            for permission in permissions {
                println!(
                    "  {} {} (via {})",
                    permission.object, permission.action, permission.subject
                );
            }
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unknown output format: {}. Valid formats: text, json",
                format
            ));
        }
    }

    Ok(())
}

async fn run(cli: Cli, config: WardenConfig) -> Result<ExitCode> {
    match cli.command {
        Commands::Init => {
            let enforcer = build_enforcer(&config).await?;
            info!("Policy store initialized");
            println!(
                "Policy store ready at {} ({} rules)",
                config.database.url,
                enforcer.rules().await.len()
            );
        }
        Commands::Allow {
            subject,
            object,
            action,
        } => {
            let enforcer = build_enforcer(&config).await?;
            let added = enforcer.add_permission(&subject, &object, &action).await?;
            print_outcome(u64::from(added), "Permission added", "Permission already present");
        }
        Commands::Disallow {
            subject,
            object,
            action,
        } => {
            let enforcer = build_enforcer(&config).await?;
            let removed = enforcer.remove_permission(&subject, &object, &action).await?;
            print_outcome(removed, "Permission removed", "No such permission");
        }
        Commands::Grant { subject, role } => {
            let roles = RoleManager::new(build_enforcer(&config).await?);
            let added = roles.assign(&subject, &role).await?;
            print_outcome(u64::from(added), "Role granted", "Role already granted");
        }
        Commands::Revoke { subject, role } => {
            let roles = RoleManager::new(build_enforcer(&config).await?);
            let removed = roles.drop_membership(&subject, &role).await?;
            print_outcome(removed, "Role revoked", "Role already revoked");
        }
        Commands::DeleteRole { role } => {
            let roles = RoleManager::new(build_enforcer(&config).await?);
            let removed = roles.delete_role(&role).await?;
            print_outcome(removed, "Role deleted", "Role already deleted");
        }
        Commands::Check {
            subject,
            object,
            action,
        } => {
            let enforcer = build_enforcer(&config).await?;
            if enforcer.enforce(&subject, &object, &action).await? {
                println!("allow");
            } else {
                println!("deny");
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Roles { subject, format } => {
            let enforcer = build_enforcer(&config).await?;
            handle_roles(&enforcer, &subject, &format).await?;
        }
        Commands::IssueToken {
            subject,
            ttl_seconds,
        } => {
            let tokens = TokenService::new(&config.token)?;
            let ttl = ttl_seconds
                .map(chrono::Duration::seconds)
                .unwrap_or_else(|| tokens.default_ttl());
            println!("{}", tokens.issue(&subject, ttl)?);
        }
        Commands::VerifyToken { token } => {
            let tokens = TokenService::new(&config.token)?;
            let claims = tokens.decode_at(&token, Utc::now())?;
            println!("subject: {}", claims.sub);
            if let Some(expires_at) = claims.expires_at() {
                println!("expires: {}", expires_at.to_rfc3339());
            }
        }
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Validate => {
                // Loading already validated every domain
                config
                    .token
                    .validate_for_signing()
                    .context("Token settings are incomplete")?;
                println!("Configuration is valid");
            }
            ConfigCommands::Sample => {
                print!("{}", WardenConfig::generate_sample());
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref(), cli.log_level.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("info"))?;
            return Err(e);
        }
    };

    init_logging_from_config(&config.logging)?;
    debug!("Policy store at {}", config.database.url);

    run(cli, config).await
}
