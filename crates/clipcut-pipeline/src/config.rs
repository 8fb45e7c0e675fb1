//! Pipeline configuration.
//!
//! Values come from built-in defaults, overlaid by `data/settings.json` when
//! present, overlaid by environment variables. Read once per process; there
//! is no hot reload.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use clipcut_llm::Provider;

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root of the per-project artifact trees
    pub projects_root: PathBuf,
    /// Directory holding settings.json
    pub data_dir: PathBuf,
    /// Root of the prompt files
    pub prompt_dir: PathBuf,

    /// LLM provider variant
    pub provider: Provider,
    /// Model name passed to the provider
    pub model_name: String,
    /// API key; empty means unconfigured and fails at client construction
    pub api_key: String,
    /// Base URL for the OpenAI-compatible provider
    pub openai_base_url: Option<String>,
    /// Retries per LLM call
    pub llm_max_retries: u32,
    /// Per-call timeout
    pub llm_timeout_seconds: u64,

    /// Target chunk duration
    pub chunk_interval_minutes: u32,
    /// Minimum inter-cue silence treated as a pause
    pub pause_threshold_ms: u64,
    /// Clips below this score are filtered out after scoring
    pub min_score_threshold: f64,
    /// Collections are truncated to this many clips
    pub max_clips_per_collection: usize,
    /// Topic duration bounds advertised to the model (minutes)
    pub min_topic_duration_minutes: u32,
    pub max_topic_duration_minutes: u32,
    pub target_topic_duration_minutes: u32,
    /// Topic count bounds per chunk advertised to the model
    pub min_topics_per_chunk: usize,
    pub max_topics_per_chunk: usize,

    /// Maximum simultaneously processing projects
    pub max_concurrent_processing: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_root: PathBuf::from("uploads"),
            data_dir: PathBuf::from("data"),
            prompt_dir: PathBuf::from("prompt"),
            provider: Provider::Native,
            model_name: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
            openai_base_url: None,
            llm_max_retries: 3,
            llm_timeout_seconds: 120,
            chunk_interval_minutes: 30,
            pause_threshold_ms: 1000,
            min_score_threshold: 0.7,
            max_clips_per_collection: 5,
            min_topic_duration_minutes: 1,
            max_topic_duration_minutes: 10,
            target_topic_duration_minutes: 3,
            min_topics_per_chunk: 3,
            max_topics_per_chunk: 10,
            max_concurrent_processing: 1,
        }
    }
}

/// Optional overrides loaded from `data/settings.json`.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    api_provider: Option<String>,
    model_name: Option<String>,
    api_key: Option<String>,
    openai_base_url: Option<String>,
    llm_max_retries: Option<u32>,
    llm_timeout_seconds: Option<u64>,
    chunk_interval_minutes: Option<u32>,
    pause_threshold_ms: Option<u64>,
    min_score_threshold: Option<f64>,
    max_clips_per_collection: Option<usize>,
    min_topic_duration_minutes: Option<u32>,
    max_topic_duration_minutes: Option<u32>,
    target_topic_duration_minutes: Option<u32>,
    min_topics_per_chunk: Option<usize>,
    max_topics_per_chunk: Option<usize>,
    max_concurrent_processing: Option<usize>,
}

impl AppConfig {
    /// Load configuration: defaults, then the settings file, then env vars.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("CLIPCUT_PROJECTS_ROOT") {
            config.projects_root = PathBuf::from(root);
        }
        if let Ok(data) = std::env::var("CLIPCUT_DATA_DIR") {
            config.data_dir = PathBuf::from(data);
        }
        if let Ok(prompts) = std::env::var("CLIPCUT_PROMPT_DIR") {
            config.prompt_dir = PathBuf::from(prompts);
        }

        let settings_path = config.data_dir.join("settings.json");
        config.apply_settings_file(&settings_path);
        config.apply_env();
        config
    }

    fn apply_settings_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let settings: SettingsFile = match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
        {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                return;
            }
        };

        if let Some(provider) = settings.api_provider.as_deref() {
            match Provider::parse(provider) {
                Some(p) => self.provider = p,
                None => warn!(provider, "unknown api_provider in settings, keeping default"),
            }
        }
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = settings.$field {
                    self.$field = v;
                }
            };
        }
        take!(model_name);
        take!(api_key);
        take!(llm_max_retries);
        take!(llm_timeout_seconds);
        take!(chunk_interval_minutes);
        take!(pause_threshold_ms);
        take!(min_score_threshold);
        take!(max_clips_per_collection);
        take!(min_topic_duration_minutes);
        take!(max_topic_duration_minutes);
        take!(target_topic_duration_minutes);
        take!(min_topics_per_chunk);
        take!(max_topics_per_chunk);
        take!(max_concurrent_processing);
        if settings.openai_base_url.is_some() {
            self.openai_base_url = settings.openai_base_url;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("CLIPCUT_PROVIDER") {
            match Provider::parse(&provider) {
                Some(p) => self.provider = p,
                None => warn!(provider, "unknown CLIPCUT_PROVIDER, keeping configured value"),
            }
        }
        if let Ok(model) = std::env::var("CLIPCUT_MODEL") {
            self.model_name = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.api_key = key;
        }
        if let Ok(url) = std::env::var("CLIPCUT_OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
        if let Ok(v) = std::env::var("CLIPCUT_MAX_CONCURRENT") {
            if let Ok(n) = v.parse() {
                self.max_concurrent_processing = n;
            }
        }
    }
}
