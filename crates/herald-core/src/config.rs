//! Herald configuration.
//!
//! Precedence: environment (`HERALD__SECTION__FIELD`) > TOML file (`HERALD_CONFIG` path,
//! default `config/herald.toml`) > built-in defaults. `.env` is loaded first so its values
//! participate as environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | HERALD__ROUTER__DEFAULT_TIMEOUT_MS | 20000 | Per-task handler budget. |
//! | HERALD__CLASSIFIER__STRATEGY | rule_based | `rule_based` or `model_assisted`. |
//! | HERALD__CLASSIFIER__TIMEOUT_MS | 5000 | Budget for the model-assisted call before falling back. |
//! | HERALD__CONFIRMATION__PENDING_TTL_SECS | 600 | Unresolved drafts older than this are dropped. |
//! | HERALD__SESSIONS__IDLE_TTL_SECS | 1800 | Idle conversations without a draft become evictable. |
//! | HERALD__SESSIONS__SWEEP_THRESHOLD | 1024 | Session count at which idle ones are swept. |
//! | HERALD__CACHE__CAPACITY | 1000 | Max cached real-time answers. |
//! | HERALD__RETRY__MAX_ATTEMPTS | 3 | Collaborator attempts per call. |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::HeraldResult;
use crate::retry::RetryPolicy;
use crate::types::{ClassifierStrategy, TaskCategory};

const ENV_CONFIG_PATH: &str = "HERALD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/herald";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub router: RouterConfig,
    pub classifier: ClassifierConfig,
    pub confirmation: ConfirmationConfig,
    pub sessions: SessionsConfig,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub realtime: RealTimeConfig,
    pub skills: SkillsConfig,
}

impl HeraldConfig {
    /// Load from `.env`, the config file named by `HERALD_CONFIG` (or `config/herald`), and
    /// `HERALD__*` environment variables.
    pub fn load() -> HeraldResult<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from an explicit file path (missing file is fine) plus environment overrides.
    pub fn load_from(path: &Path) -> HeraldResult<Self> {
        let built = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("HERALD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let cfg: HeraldConfig = built.try_deserialize()?;
        tracing::debug!(
            target: "herald::config",
            path = %path.display(),
            strategy = ?cfg.classifier.strategy,
            default_timeout_ms = cfg.router.default_timeout_ms,
            "configuration loaded"
        );
        Ok(cfg)
    }
}

fn default_timeout_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Budget applied to every category without an override.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Per-category budgets, keyed by snake_case category name.
    #[serde(default)]
    pub timeout_overrides_ms: HashMap<TaskCategory, u64>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            timeout_overrides_ms: HashMap::new(),
        }
    }
}

impl RouterConfig {
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout_ms: timeout.as_millis() as u64,
            timeout_overrides_ms: HashMap::new(),
        }
    }

    pub fn timeout_for(&self, category: TaskCategory) -> Duration {
        let ms = self
            .timeout_overrides_ms
            .get(&category)
            .copied()
            .unwrap_or(self.default_timeout_ms);
        Duration::from_millis(ms.max(1))
    }
}

fn default_classifier_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub strategy: ClassifierStrategy,
    /// Budget for one model-assisted classification call.
    #[serde(default = "default_classifier_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: ClassifierStrategy::default(),
            timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

fn default_pending_ttl_secs() -> u64 {
    600
}

fn default_confirm_keywords() -> Vec<String> {
    vec!["confirm".into(), "yes send".into(), "send it".into()]
}

fn default_cancel_keywords() -> Vec<String> {
    vec!["cancel".into(), "discard".into(), "never mind".into()]
}

fn default_edit_keywords() -> Vec<String> {
    vec!["edit".into(), "change".into(), "rewrite".into()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Pending drafts older than this are discarded when the next utterance arrives.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_confirm_keywords")]
    pub confirm_keywords: Vec<String>,
    #[serde(default = "default_cancel_keywords")]
    pub cancel_keywords: Vec<String>,
    #[serde(default = "default_edit_keywords")]
    pub edit_keywords: Vec<String>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
            confirm_keywords: default_confirm_keywords(),
            cancel_keywords: default_cancel_keywords(),
            edit_keywords: default_edit_keywords(),
        }
    }
}

impl ConfirmationConfig {
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }
}

fn default_idle_ttl_secs() -> u64 {
    1800
}

fn default_sweep_threshold() -> usize {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    /// Idle sessions are swept when a new conversation arrives and at least this many exist.
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl SessionsConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CACHE_CAPACITY
}

fn default_cache_ttl_secs() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// TTL for answers fetched from external providers.
    #[serde(default = "default_cache_ttl_secs")]
    pub provider_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            provider_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn provider_ttl(&self) -> Duration {
        Duration::from_secs(self.provider_ttl_secs)
    }
}

fn default_fallback_results() -> usize {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealTimeConfig {
    /// Results shown from the generic web-search fallback.
    #[serde(default = "default_fallback_results")]
    pub fallback_results: usize,
    /// Ask the structured classifier to infer a category when none is known.
    #[serde(default = "default_true")]
    pub ai_categorization: bool,
}

impl Default for RealTimeConfig {
    fn default() -> Self {
        Self {
            fallback_results: default_fallback_results(),
            ai_categorization: true,
        }
    }
}

fn default_max_search_results() -> usize {
    5
}

fn default_max_subject_chars() -> usize {
    150
}

fn default_max_body_chars() -> usize {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Web search result count (capped at 20).
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
    #[serde(default = "default_max_subject_chars")]
    pub max_subject_chars: usize,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            max_search_results: default_max_search_results(),
            max_subject_chars: default_max_subject_chars(),
            max_body_chars: default_max_body_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let cfg = HeraldConfig::default();
        assert_eq!(cfg.router.timeout_for(TaskCategory::Weather), Duration::from_secs(20));
        assert_eq!(cfg.classifier.strategy, ClassifierStrategy::RuleBased);
        assert_eq!(cfg.cache.capacity, 1000);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert!(cfg.confirmation.confirm_keywords.contains(&"confirm".to_string()));
    }

    #[test]
    fn per_category_override_wins() {
        let mut router = RouterConfig::with_default_timeout(Duration::from_millis(500));
        router.timeout_overrides_ms.insert(TaskCategory::WebSearch, 900);
        assert_eq!(router.timeout_for(TaskCategory::WebSearch), Duration::from_millis(900));
        assert_eq!(router.timeout_for(TaskCategory::Todo), Duration::from_millis(500));
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[router]
default_timeout_ms = 1500

[router.timeout_overrides_ms]
real_time = 4000

[classifier]
strategy = "model_assisted"

[cache]
capacity = 64

[sessions]
idle_ttl_secs = 300
"#
        )
        .unwrap();

        let cfg = HeraldConfig::load_from(&path).unwrap();
        assert_eq!(cfg.router.default_timeout_ms, 1500);
        assert_eq!(cfg.router.timeout_for(TaskCategory::RealTime), Duration::from_millis(4000));
        assert_eq!(cfg.classifier.strategy, ClassifierStrategy::ModelAssisted);
        assert_eq!(cfg.cache.capacity, 64);
        assert_eq!(cfg.sessions.idle_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.sessions.sweep_threshold, 1024);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.skills.max_subject_chars, 150);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = HeraldConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.router.default_timeout_ms, 20_000);
    }
}
