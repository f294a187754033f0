//! Integration tests for warden-config

use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;
use warden_config::*;

#[test]
fn test_default_config_validation() {
    let config = WardenConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("WARDEN_DATABASE_URL", Some("sqlite::memory:")),
        ("WARDEN_DATABASE_MAX_CONNECTIONS", Some("1")),
        ("WARDEN_STORE_TIMEOUT_SECONDS", Some("2")),
        ("WARDEN_TOKEN_SECRET", Some("top-secret")),
        ("WARDEN_TOKEN_TTL_SECONDS", Some("120")),
        ("WARDEN_SUPER_USER", Some("root")),
        ("WARDEN_LOG_LEVEL", Some("debug")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_env().unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.store_timeout, Duration::from_secs(2));
        assert_eq!(config.token.secret, "top-secret");
        assert_eq!(config.token.ttl, Duration::from_secs(120));
        assert_eq!(config.policy.super_user.as_deref(), Some("root"));
        assert_eq!(config.logging.level, LogLevel::Debug);
    });
}

#[test]
fn test_invalid_env_value_is_reported() {
    with_vars(vec![("WARDEN_TOKEN_TTL_SECONDS", Some("soon"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(_)));
        assert!(err.to_string().contains("WARDEN_TOKEN_TTL_SECONDS"));
    });
}

#[test]
fn test_fractional_seconds_from_env() {
    with_vars(vec![("WARDEN_TOKEN_TTL_SECONDS", Some("0.5"))], || {
        let config = ConfigLoader::new().from_env().unwrap();
        assert_eq!(config.token.ttl, Duration::from_millis(500));
    });

    with_vars(vec![("WARDEN_STORE_TIMEOUT_SECONDS", Some("-1"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(err.to_string().contains("WARDEN_STORE_TIMEOUT_SECONDS"));
    });
}

#[test]
fn test_load_picks_file_or_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "policy:\n  super_user: admin").unwrap();

    with_vars(vec![("WARDEN_SUPER_USER", None::<&str>)], || {
        let loader = ConfigLoader::new();
        let from_file = loader.load(Some(file.path())).unwrap();
        assert_eq!(from_file.policy.super_user.as_deref(), Some("admin"));

        let from_env = loader.load(None::<&std::path::Path>).unwrap();
        assert!(from_env.policy.super_user.is_none());
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("GATE_SUPER_USER", Some("admin"))], || {
        let config = ConfigLoader::with_prefix("GATE").from_env().unwrap();
        assert_eq!(config.policy.super_user.as_deref(), Some("admin"));
    });
}

#[test]
fn test_yaml_config_serialization() {
    let yaml = WardenConfig::generate_sample();
    let parsed: WardenConfig = serde_yaml::from_str(&yaml).unwrap();
    assert!(parsed.validate_all().is_ok());
}

#[test]
fn test_comprehensive_config() {
    let yaml = r#"
database:
  url: "sqlite::memory:"
  max_connections: 1
  store_timeout: 3

token:
  secret: "file-secret"
  issuer: "auth-service"
  ttl: 900

policy:
  super_user: "root"
  wildcard_matching: true
  reload_interval: 60
  seed_roles:
    admin:
      description: "Role administrators"
      permissions: ["role:add", "role:del"]
    auditor:
      permissions: ["user:list"]
      inherits_from: ["viewer"]

logging:
  level: warn
  format: json
"#;

    with_vars(Vec::<(&str, Option<&str>)>::new(), || {
        let config = ConfigLoader::new().from_yaml(yaml).unwrap();

        assert_eq!(config.database.store_timeout, Duration::from_secs(3));
        assert_eq!(config.token.issuer, "auth-service");
        assert_eq!(config.token.audience, "warden-clients");
        assert_eq!(config.token.ttl, Duration::from_secs(900));
        assert!(config.policy.wildcard_matching);
        assert_eq!(config.policy.reload_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.policy.seed_roles.len(), 2);
        assert_eq!(
            config.policy.seed_roles["auditor"].inherits_from,
            vec!["viewer".to_string()]
        );
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_env_overrides_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "policy:\n  super_user: \"root\"").unwrap();

    with_vars(vec![("WARDEN_SUPER_USER", Some("superadmin"))], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();
        assert_eq!(config.policy.super_user.as_deref(), Some("superadmin"));
    });
}

#[test]
fn test_invalid_seed_role_fails_validation() {
    let yaml = r#"
policy:
  seed_roles:
    admin:
      permissions: ["role-add"]
"#;
    let err = ConfigLoader::new().from_yaml(yaml).unwrap_err();
    assert_eq!(err.domain(), Some("policy"));
}

#[test]
fn test_missing_file() {
    let err = ConfigLoader::new()
        .from_file("/nonexistent/warden.yaml")
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileReadError(_)));
}
