use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

pub const PROJECT_CONFIG_DIR: &str = ".oss-agent";
pub const DEFAULT_MODEL_ID: &str = "openai.gpt-oss-20b-1:0";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Reply in rhyme, including Haiku, Syllabic and Alliteration";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningEffort {
    #[default]
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!("expected low, medium or high, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_id: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub streaming: bool,
    pub show_reasoning: bool,
    pub reasoning_effort: ReasoningEffort,
    pub system_prompt: String,
    pub log_level: String,
    pub project_root: PathBuf,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: bedrock_openai_url(DEFAULT_REGION),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            streaming: true,
            show_reasoning: true,
            reasoning_effort: ReasoningEffort::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
    pub respect_retry_after: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 900_000,
            request_timeout_ms: 900_000,
            read_timeout_ms: 900_000,
            // three attempts in total
            max_retries: 2,
            retry_base_ms: 1_000,
            retry_jitter_ms: 1_000,
            respect_retry_after: true,
        }
    }
}

/// Values given on the command line. They win over every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model_id: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub streaming: Option<bool>,
    pub show_reasoning: Option<bool>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub system_prompt: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub model_id: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub streaming: Option<bool>,
    pub show_reasoning: Option<bool>,
    pub reasoning_effort: Option<String>,
    pub system_prompt: Option<String>,
    pub log_level: Option<String>,
    pub llm: Option<PartialLlmConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLlmConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_ms: Option<u64>,
    pub retry_jitter_ms: Option<u64>,
    pub respect_retry_after: Option<bool>,
}

impl PartialLlmConfig {
    fn or(self, other: PartialLlmConfig) -> PartialLlmConfig {
        PartialLlmConfig {
            connect_timeout_ms: self.connect_timeout_ms.or(other.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.or(other.request_timeout_ms),
            read_timeout_ms: self.read_timeout_ms.or(other.read_timeout_ms),
            max_retries: self.max_retries.or(other.max_retries),
            retry_base_ms: self.retry_base_ms.or(other.retry_base_ms),
            retry_jitter_ms: self.retry_jitter_ms.or(other.retry_jitter_ms),
            respect_retry_after: self.respect_retry_after.or(other.respect_retry_after),
        }
    }

    fn into_config(self) -> LlmConfig {
        let d = LlmConfig::default();
        LlmConfig {
            connect_timeout_ms: self.connect_timeout_ms.unwrap_or(d.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.unwrap_or(d.request_timeout_ms),
            read_timeout_ms: self.read_timeout_ms.unwrap_or(d.read_timeout_ms),
            max_retries: self.max_retries.unwrap_or(d.max_retries),
            retry_base_ms: self.retry_base_ms.unwrap_or(d.retry_base_ms),
            retry_jitter_ms: self.retry_jitter_ms.unwrap_or(d.retry_jitter_ms),
            respect_retry_after: self.respect_retry_after.unwrap_or(d.respect_retry_after),
        }
    }
}

pub fn bedrock_openai_url(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com/openai/v1")
}

/// `true`, `1` and `yes` (any case) are true; everything else is false.
pub fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn env_parsed<T, F>(env: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn parse_effort(key: &'static str, raw: &str) -> Result<ReasoningEffort, ConfigError> {
    raw.parse().map_err(|reason| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason,
    })
}

impl AppConfig {
    /// Reads the process environment and config files once. The result is
    /// passed explicitly to everything that needs it.
    pub fn load(overrides: CliOverrides) -> Result<Self> {
        let project_root = std::env::current_dir().context("resolve current dir")?;
        let project_cfg = load_project_config(&project_root).unwrap_or_default();
        let file_cfg = load_file_config().unwrap_or_default();
        let cfg = Self::resolve(
            overrides,
            |key| std::env::var(key).ok(),
            project_cfg,
            file_cfg,
            project_root,
        )?;
        Ok(cfg)
    }

    /// Merge order: CLI, environment, project file, global file, default.
    pub fn resolve<F>(
        cli: CliOverrides,
        env: F,
        project_cfg: FileConfig,
        file_cfg: FileConfig,
        project_root: PathBuf,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_id = cli
            .model_id
            .or_else(|| env("STRANDS_MODEL_ID"))
            .or(project_cfg.model_id)
            .or(file_cfg.model_id)
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let base_url = cli
            .base_url
            .or_else(|| env("STRANDS_BASE_URL"))
            .or(project_cfg.base_url)
            .or(file_cfg.base_url)
            .unwrap_or_else(|| {
                let region = env("AWS_REGION")
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REGION.to_string());
                bedrock_openai_url(&region)
            });

        let api_key = env("AWS_BEARER_TOKEN_BEDROCK")
            .or_else(|| env("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty());

        let max_tokens = match cli.max_tokens {
            Some(v) => v,
            None => env_parsed::<u32, _>(&env, "STRANDS_MAX_TOKENS")?
                .or(project_cfg.max_tokens)
                .or(file_cfg.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
        };

        let temperature = match cli.temperature {
            Some(v) => v,
            None => env_parsed::<f32, _>(&env, "STRANDS_TEMPERATURE")?
                .or(project_cfg.temperature)
                .or(file_cfg.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
        };
        if !temperature.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "STRANDS_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be a finite number".to_string(),
            });
        }

        let streaming = cli
            .streaming
            .or_else(|| env("STRANDS_STREAMING").map(|v| parse_bool_flag(&v)))
            .or(project_cfg.streaming)
            .or(file_cfg.streaming)
            .unwrap_or(true);

        let show_reasoning = cli
            .show_reasoning
            .or_else(|| env("STRANDS_SHOW_REASONING").map(|v| parse_bool_flag(&v)))
            .or(project_cfg.show_reasoning)
            .or(file_cfg.show_reasoning)
            .unwrap_or(true);

        let reasoning_effort = match cli.reasoning_effort {
            Some(effort) => effort,
            None => match env("STRANDS_REASONING_EFFORT") {
                Some(raw) => parse_effort("STRANDS_REASONING_EFFORT", &raw)?,
                None => match project_cfg.reasoning_effort.or(file_cfg.reasoning_effort) {
                    Some(raw) => parse_effort("reasoning_effort", &raw)?,
                    None => ReasoningEffort::default(),
                },
            },
        };

        let system_prompt = cli
            .system_prompt
            .or_else(|| env("STRANDS_SYSTEM_PROMPT"))
            .or(project_cfg.system_prompt)
            .or(file_cfg.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let log_level = cli
            .log_level
            .or_else(|| env("OSS_AGENT_LOG"))
            .or(project_cfg.log_level)
            .or(file_cfg.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let llm = project_cfg
            .llm
            .unwrap_or_default()
            .or(file_cfg.llm.unwrap_or_default())
            .into_config();

        Ok(Self {
            model_id,
            base_url,
            api_key,
            max_tokens,
            temperature,
            streaming,
            show_reasoning,
            reasoning_effort,
            system_prompt,
            log_level,
            project_root,
            llm,
        })
    }
}

pub fn load_file_config() -> Result<FileConfig> {
    fn candidate_paths() -> Vec<PathBuf> {
        let mut v = Vec::new();
        if let Ok(p) = std::env::var("OSS_AGENT_CONFIG") {
            v.push(PathBuf::from(p));
        }
        if let Some(dir) = dirs::config_dir() {
            v.push(dir.join("oss-agent").join("config.toml"));
        }
        v
    }

    for p in candidate_paths() {
        if p.exists() {
            let s = fs::read_to_string(&p)
                .with_context(|| format!("read config file: {}", p.display()))?;
            match toml::from_str::<FileConfig>(&s) {
                Ok(cfg) => {
                    info!(path=%p.display(), "loaded config file");
                    return Ok(cfg);
                }
                Err(e) => {
                    warn!(path=%p.display(), error=%e.to_string(), "parse config failed");
                    continue;
                }
            }
        }
    }
    Ok(FileConfig::default())
}

/// Load project-specific configuration from .oss-agent/config.toml
pub fn load_project_config(project_root: &Path) -> Result<FileConfig> {
    let project_config_path = project_root.join(PROJECT_CONFIG_DIR).join("config.toml");

    if project_config_path.exists() {
        let s = fs::read_to_string(&project_config_path).with_context(|| {
            format!(
                "read project config file: {}",
                project_config_path.display()
            )
        })?;
        match toml::from_str::<FileConfig>(&s) {
            Ok(cfg) => {
                info!(path=%project_config_path.display(), "loaded project config file");
                Ok(cfg)
            }
            Err(e) => {
                warn!(path=%project_config_path.display(), error=%e.to_string(), "parse project config failed");
                Ok(FileConfig::default())
            }
        }
    } else {
        Ok(FileConfig::default())
    }
}
