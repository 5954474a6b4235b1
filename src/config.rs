use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TABLES: [&str; 4] = ["incident", "problem", "change_request", "sc_task"];

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub servicenow: Option<ServiceNowConfig>,
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceNowConfig {
    /// Instance name, as in `<instance>.service-now.com`.
    pub instance: Option<String>,
    /// Full base URL; takes precedence over `instance`.
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    /// Site name, as in `<domain>.atlassian.net`.
    pub domain: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_project_key")]
    pub project_key: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Directory holding `number-mapping.json`. Defaults to `~/.snow2jira`.
    pub data_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            data_dir: None,
        }
    }
}

impl SyncConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(data_dir)
    }
}

impl ServiceNowConfig {
    pub fn base_url(&self) -> Result<String> {
        match (&self.base_url, &self.instance) {
            (Some(url), _) => Ok(url.trim_end_matches('/').to_string()),
            (None, Some(instance)) => Ok(format!("https://{instance}.service-now.com")),
            (None, None) => bail!("[servicenow] needs either `instance` or `base_url`"),
        }
    }
}

impl JiraConfig {
    pub fn base_url(&self) -> Result<String> {
        match (&self.base_url, &self.domain) {
            (Some(url), _) => Ok(url.trim_end_matches('/').to_string()),
            (None, Some(domain)) => Ok(format!("https://{domain}.atlassian.net")),
            (None, None) => bail!("[jira] needs either `domain` or `base_url`"),
        }
    }
}

fn default_tables() -> Vec<String> {
    DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
}

fn default_page_limit() -> usize {
    5
}

fn default_project_key() -> String {
    "SER".into()
}

fn default_issue_type() -> String {
    "Task".into()
}

fn default_call_timeout() -> u64 {
    30
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".snow2jira")
}

pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Load the config file (a missing file yields defaults), then apply
/// credential overrides from the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        parse_config(&contents)?
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        AppConfig::default()
    };
    apply_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).with_context(|| "Failed to parse config.toml")
}

fn apply_env(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(sn) = config.servicenow.as_mut() {
        if let Some(user) = var("SERVICENOW_USER") {
            sn.username = user;
        }
        if let Some(pass) = var("SERVICENOW_PASS") {
            sn.password = pass;
        }
    }
    if let Some(jira) = config.jira.as_mut() {
        if let Some(email) = var("JIRA_EMAIL") {
            jira.email = email;
        }
        if let Some(token) = var("JIRA_API_TOKEN") {
            jira.api_token = token;
        }
    }
}

impl AppConfig {
    /// Tables offered for migration. Static configuration, never queried.
    pub fn tables(&self) -> Vec<String> {
        self.servicenow
            .as_ref()
            .map(|sn| sn.tables.clone())
            .unwrap_or_else(default_tables)
    }

    pub fn servicenow(&self) -> Result<&ServiceNowConfig> {
        self.servicenow
            .as_ref()
            .context("No [servicenow] section in config.toml")
    }

    pub fn jira(&self) -> Result<&JiraConfig> {
        self.jira.as_ref().context("No [jira] section in config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [servicenow]
        instance = "dev331433"
        username = "admin"
        password = "secret"

        [jira]
        domain = "acme"
        email = "ops@acme.test"
        api_token = "tok"
    "#;

    #[test]
    fn parses_sections_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        let sn = config.servicenow().unwrap();
        assert_eq!(sn.base_url().unwrap(), "https://dev331433.service-now.com");
        assert_eq!(sn.page_limit, 5);
        assert_eq!(config.tables(), vec!["incident", "problem", "change_request", "sc_task"]);

        let jira = config.jira().unwrap();
        assert_eq!(jira.base_url().unwrap(), "https://acme.atlassian.net");
        assert_eq!(jira.project_key, "SER");
        assert_eq!(jira.issue_type, "Task");
        assert_eq!(config.sync.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn base_url_wins_over_instance() {
        let config = parse_config(
            r#"
            [servicenow]
            instance = "ignored"
            base_url = "http://localhost:8080/"
            tables = ["incident"]
            page_limit = 20
            "#,
        )
        .unwrap();
        let sn = config.servicenow().unwrap();
        assert_eq!(sn.base_url().unwrap(), "http://localhost:8080");
        assert_eq!(config.tables(), vec!["incident"]);
        assert_eq!(sn.page_limit, 20);
    }

    #[test]
    fn missing_location_is_an_error() {
        let config = parse_config("[jira]\nemail = \"a\"").unwrap();
        assert!(config.jira().unwrap().base_url().is_err());
        assert!(config.servicenow().is_err());
    }

    #[test]
    fn empty_config_uses_default_tables() {
        let config = parse_config("").unwrap();
        assert_eq!(config.tables().len(), 4);
        assert!(config.jira().is_err());
    }

    #[test]
    fn env_overrides_credentials() {
        let mut config = parse_config(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SERVICENOW_USER", "svc"),
            ("SERVICENOW_PASS", "hunter2"),
            ("JIRA_API_TOKEN", "env-token"),
        ]);
        apply_env(&mut config, |name| env.get(name).map(|v| v.to_string()));

        let sn = config.servicenow().unwrap();
        assert_eq!(sn.username, "svc");
        assert_eq!(sn.password, "hunter2");
        let jira = config.jira().unwrap();
        assert_eq!(jira.api_token, "env-token");
        assert_eq!(jira.email, "ops@acme.test");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = parse_config("[sync]\ncall_timeout_secs = 0").unwrap();
        assert_eq!(config.sync.call_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path().join("nope.toml").as_path())).unwrap();
        assert!(config.servicenow.is_none());
    }
}
