use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::llm::{ProviderDescriptor, ProviderKind};

pub const DEFAULT_CONFIG_FILE: &str = "slipscan.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub server: ServerSection,
    /// Tried in order; the first non-empty answer wins.
    #[serde(default)]
    pub providers: Vec<ProviderSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    pub listen_addr: String,
    /// Request bodies carry base64 images, so this is generous.
    pub max_body_bytes: usize,
    /// Upstream model call timeout. Unset means the HTTP client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSection {
    pub name: String,
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key or token.
    pub api_key_env: String,
    /// For Cloudflare Workers AI: environment variable holding the account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id_env: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSection {
                listen_addr: "0.0.0.0:8787".to_string(),
                max_body_bytes: 12 * 1024 * 1024,
                upstream_timeout_secs: None,
            },
            providers: vec![
                ProviderSection {
                    name: "gemini".to_string(),
                    kind: ProviderKind::Gemini,
                    model: "gemini-2.0-flash".to_string(),
                    base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                    api_key_env: "GEMINI_API_KEY".to_string(),
                    account_id_env: None,
                },
                ProviderSection {
                    name: "openrouter".to_string(),
                    kind: ProviderKind::OpenAiCompatible,
                    model: "meta-llama/llama-3.2-11b-vision-instruct:free".to_string(),
                    base_url: "https://openrouter.ai/api/v1".to_string(),
                    api_key_env: "OPENROUTER_API_KEY".to_string(),
                    account_id_env: None,
                },
                ProviderSection {
                    name: "groq".to_string(),
                    kind: ProviderKind::OpenAiCompatible,
                    model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    api_key_env: "GROQ_API_KEY".to_string(),
                    account_id_env: None,
                },
                ProviderSection {
                    name: "cloudflare".to_string(),
                    kind: ProviderKind::CloudflareWorkersAi,
                    model: "@cf/meta/llama-3.2-11b-vision-instruct".to_string(),
                    base_url: "https://api.cloudflare.com/client/v4".to_string(),
                    api_key_env: "CLOUDFLARE_API_TOKEN".to_string(),
                    account_id_env: Some("CLOUDFLARE_ACCOUNT_ID".to_string()),
                },
            ],
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen_addr '{}'", self.server.listen_addr))
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.server.upstream_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve credentials from the environment. Providers without a key
    /// are skipped.
    pub fn resolve_providers(&self) -> Vec<ProviderDescriptor> {
        self.resolve_providers_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_providers_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<ProviderDescriptor> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        self.providers
            .iter()
            .filter_map(|p| {
                let Some(api_key) = non_empty(&p.api_key_env) else {
                    info!(provider = %p.name, env = %p.api_key_env, "no credential; provider skipped");
                    return None;
                };
                let account_id = match &p.account_id_env {
                    Some(env) => match non_empty(env) {
                        Some(id) => Some(id),
                        None => {
                            info!(provider = %p.name, env = %env, "no account id; provider skipped");
                            return None;
                        }
                    },
                    None => None,
                };
                Some(ProviderDescriptor {
                    name: p.name.clone(),
                    kind: p.kind,
                    base_url: p.base_url.trim_end_matches('/').to_string(),
                    model: p.model.clone(),
                    api_key,
                    account_id,
                })
            })
            .collect()
    }
}

/// `--config` wins, then `SLIPSCAN_CONFIG`, then `./slipscan.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    std::env::var("SLIPSCAN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!(path = %path.display(), "config not found; using defaults");
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}
