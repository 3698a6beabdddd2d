use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::ReleaseLayout;

/// The closed set of deployment environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lowercase")]
pub enum TargetName {
    Staging,
    Production,
}

impl TargetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetName::Staging => "staging",
            TargetName::Production => "production",
        }
    }

    pub fn all() -> &'static [TargetName] {
        &[TargetName::Staging, TargetName::Production]
    }
}

impl std::str::FromStr for TargetName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "staging" => Ok(TargetName::Staging),
            "production" => Ok(TargetName::Production),
            other => Err(Error::validation_invalid_argument(
                "target",
                format!("Unknown target '{}'", other),
                Some(vec!["staging".to_string(), "production".to_string()]),
            )),
        }
    }
}

impl std::fmt::Display for TargetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the target name from the `--target` flag, falling back to the
/// `TARGET` environment variable, then to staging.
pub fn resolve_name(flag: Option<TargetName>) -> Result<TargetName> {
    if let Some(name) = flag {
        return Ok(name);
    }
    match std::env::var("TARGET") {
        Ok(value) if !value.is_empty() => value.parse(),
        _ => Ok(TargetName::Staging),
    }
}

/// A shared-directory fixture linked into every release.
/// `from` is relative to `<home>/shared`, `to` relative to the release dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLink {
    pub from: String,
    pub to: String,
}

/// One deployment environment: connection identity plus the command
/// templates the release plan is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(skip_deserializing, default = "default_name")]
    pub name: TargetName,
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,

    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub home: String,

    #[serde(default = "default_shared_links")]
    pub shared_links: Vec<SharedLink>,
    #[serde(default = "default_checkout_command")]
    pub checkout_command: String,
    #[serde(default = "default_install_command")]
    pub install_command: String,
    #[serde(default = "default_index_command")]
    pub index_command: String,
    #[serde(default = "default_assets_command")]
    pub assets_command: String,
    #[serde(default = "default_start_command")]
    pub start_command: String,
    #[serde(default = "default_restart_command")]
    pub restart_command: String,
    #[serde(default = "default_stop_command")]
    pub stop_command: String,
    #[serde(default = "default_clear_cache_command")]
    pub clear_cache_command: String,
    #[serde(default = "default_cron_set_command")]
    pub cron_set_command: String,
    #[serde(default = "default_cron_disable_command")]
    pub cron_disable_command: String,

    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,
    /// Per-step timeout in seconds; None disables the timeout wrapper.
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
}

fn default_name() -> TargetName {
    TargetName::Staging
}

fn default_port() -> u16 {
    22
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_keep_releases() -> usize {
    10
}

fn default_shared_links() -> Vec<SharedLink> {
    [
        ("sitemap", "public/sitemap"),
        ("config.yml", "config/config.yml"),
        ("services.yml", "config/services.yml"),
        ("config.ru", "config.ru"),
        ("unicorn.rb", "unicorn.rb"),
    ]
    .into_iter()
    .map(|(from, to)| SharedLink {
        from: from.to_string(),
        to: to.to_string(),
    })
    .collect()
}

fn default_checkout_command() -> String {
    "git clone -q -b {{branch}} {{repo}} {{version_path}}".to_string()
}

fn default_install_command() -> String {
    "cd {{version_path}} && bundle install --local".to_string()
}

fn default_index_command() -> String {
    "cd {{version_path}} && rake create_indexes".to_string()
}

fn default_assets_command() -> String {
    "cd {{version_path}} && rake assets:sync".to_string()
}

fn default_start_command() -> String {
    "cd {{current_path}} && unicorn -D -l {{shared_path}}/{{user}}.sock -c unicorn.rb".to_string()
}

fn default_restart_command() -> String {
    "kill -USR2 `cat {{shared_path}}/unicorn.pid`".to_string()
}

fn default_stop_command() -> String {
    "kill `cat {{shared_path}}/unicorn.pid`".to_string()
}

fn default_clear_cache_command() -> String {
    "cd {{current_path}} && rake clear_cache".to_string()
}

fn default_cron_set_command() -> String {
    "cd {{current_path}} && rake crontab:set environment={{target}} current_path={{current_path}}"
        .to_string()
}

fn default_cron_disable_command() -> String {
    "cd {{current_path}} && rake crontab:disable".to_string()
}

impl Target {
    pub fn layout(&self) -> ReleaseLayout {
        ReleaseLayout::new(&self.home)
    }

    /// Eager validation: a malformed target must fail before any remote
    /// effect, so every other component can treat these fields as trusted.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::config_invalid_value(
                "host",
                None,
                "Target host must not be empty",
            ));
        }
        if self.user.is_empty() {
            return Err(Error::config_invalid_value(
                "user",
                None,
                "Target user must not be empty",
            ));
        }
        if self.repo.is_empty() {
            return Err(Error::config_invalid_value(
                "repo",
                None,
                "Target repo must not be empty",
            ));
        }
        if !self.home.starts_with('/') {
            return Err(Error::config_invalid_value(
                "home",
                Some(self.home.clone()),
                "Target home must be an absolute path",
            ));
        }
        if self.home.trim_end_matches('/').is_empty() {
            return Err(Error::config_invalid_value(
                "home",
                Some(self.home.clone()),
                "Target home must not be the filesystem root",
            ));
        }
        if self.keep_releases == 0 {
            return Err(Error::config_invalid_value(
                "keepReleases",
                Some("0".to_string()),
                "At least one release must be retained",
            ));
        }
        Ok(())
    }
}
