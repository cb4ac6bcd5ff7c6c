use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Runs the shelf CRUD service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shelf")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    port: i32,
    #[serde(default = "default_data_file")]
    data_file: String,
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub database_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_port() -> i32 {
    3000
}

fn default_data_file() -> String {
    "db.json".to_string()
}

fn default_database() -> String {
    "shelf.db".to_string()
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            port: default_port(),
            data_file: default_data_file(),
            database: default_database(),
            database_url: None,
            database_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_port(&self) -> i32 {
        self.port
    }

    pub fn get_data_file(&self) -> &str {
        &self.data_file
    }

    pub fn get_db(&self) -> &str {
        &self.database
    }

    /// Remote url and auth token, when both are set and non-empty.
    pub fn remote(&self) -> Option<(&str, &str)> {
        let url = self.database_url.as_deref().filter(|s| !s.is_empty())?;
        let token = self.database_auth_token.as_deref().filter(|s| !s.is_empty())?;
        Some((url, token))
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    File,
    Database,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Bare records, PUT answers with the whole collection.
    #[default]
    Plain,
    /// Enveloped, schema-checked notes with PATCH.
    Notes,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResourceConfig {
    pub name: String,
    pub backend: Backend,
    #[serde(default)]
    pub style: Style,
}

impl ResourceConfig {
    pub fn new(name: &str, backend: Backend, style: Style) -> Self {
        ResourceConfig {
            name: name.to_string(),
            backend,
            style,
        }
    }
}

fn default_resources() -> Vec<ResourceConfig> {
    vec![
        ResourceConfig::new("books", Backend::File, Style::Plain),
        ResourceConfig::new("users", Backend::File, Style::Plain),
        ResourceConfig::new("posts", Backend::File, Style::Plain),
        ResourceConfig::new("notes", Backend::Database, Style::Notes),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default = "default_resources")]
    pub resources: Vec<ResourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: App::default(),
            resources: default_resources(),
        }
    }
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str);
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for resource in &self.resources {
            let name = resource.name.as_str();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                anyhow::bail!("invalid resource name {:?}", name);
            }
            if !seen.insert(name) {
                anyhow::bail!("resource {:?} configured twice", name);
            }
        }
        Ok(())
    }

    /// Names of the file-backed collections, in configuration order.
    pub fn file_collections(&self) -> Vec<String> {
        self.resources
            .iter()
            .filter(|r| r.backend == Backend::File)
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn needs_database(&self) -> bool {
        self.resources.iter().any(|r| r.backend == Backend::Database)
    }

    /// Expands `${VAR}` and `${VAR:-default}`. An unterminated `${` is left
    /// as written.
    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut out = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            out.push_str(&resolve_var(&rest[start + 2..start + len]));
            rest = &rest[start + len + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn resolve_var(expr: &str) -> String {
    let (name, default) = match expr.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (expr, None),
    };

    match (env::var(name), default) {
        (Ok(value), _) => value,
        (Err(_), Some(default)) => default.to_string(),
        (Err(_), None) => {
            tracing::warn!(var = name, "environment variable not set, substituting empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let cfg = Config::from_yaml("{}").unwrap();
        assert_eq!(cfg.app.get_port(), 3000);
        assert_eq!(cfg.app.get_data_file(), "db.json");
        assert_eq!(cfg.file_collections(), vec!["books", "users", "posts"]);
        assert!(cfg.needs_database());
        assert!(cfg.app.remote().is_none());
    }

    #[test]
    fn test_env_substitution_with_default() {
        let cfg = Config::from_yaml(
            "app:\n  port: ${SHELF_TEST_SURELY_UNSET_PORT:-4100}\n  database: ':memory:'\n",
        )
        .unwrap();
        assert_eq!(cfg.app.get_port(), 4100);
        assert_eq!(cfg.app.get_db(), ":memory:");
    }

    #[test]
    fn test_substitution_edge_cases() {
        assert_eq!(
            Config::substitute_env_vars("a: ${SHELF_TEST_SURELY_UNSET_A}\nb: x"),
            "a: \nb: x"
        );
        assert_eq!(
            Config::substitute_env_vars("${SHELF_TEST_SURELY_UNSET_A:-1}-${SHELF_TEST_SURELY_UNSET_B:-2}"),
            "1-2"
        );
        assert_eq!(Config::substitute_env_vars("port: ${PORT"), "port: ${PORT");
        assert_eq!(Config::substitute_env_vars("no vars"), "no vars");
    }

    #[test]
    fn test_empty_remote_is_ignored() {
        let cfg = Config::from_yaml(
            "app:\n  database_url: ${SHELF_TEST_SURELY_UNSET_URL:-}\n  database_auth_token: abc\n",
        )
        .unwrap();
        assert!(cfg.app.remote().is_none());
    }

    #[test]
    fn test_remote_requires_url_and_token() {
        let cfg = Config::from_yaml(
            "app:\n  database_url: libsql://example.turso.io\n  database_auth_token: abc\n",
        )
        .unwrap();
        assert_eq!(cfg.app.remote(), Some(("libsql://example.turso.io", "abc")));
    }

    #[test]
    fn test_resources_parse() {
        let yaml = r#"
resources:
  - name: books
    backend: file
  - name: notes
    backend: database
    style: notes
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.resources.len(), 2);
        assert_eq!(cfg.resources[0].style, Style::Plain);
        assert_eq!(cfg.resources[1].backend, Backend::Database);
        assert_eq!(cfg.resources[1].style, Style::Notes);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let yaml = r#"
resources:
  - name: books
    backend: file
  - name: books
    backend: database
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_resource_name_rejected() {
        let yaml = r#"
resources:
  - name: "books/:id"
    backend: file
"#;
        assert!(Config::from_yaml(yaml).unwrap().validate().is_err());
    }
}
