//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use leadflow_core::scoring::FrsWeights;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// SMS compliance configuration
    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Intent scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Qualification-gate and handoff thresholds
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Collaborator deadlines
    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// LLM collaborator configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// CRM collaborator configuration
    #[serde(default)]
    pub crm: CrmConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty list means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            cors_enabled: true,
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle lifetime before a session is evicted
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Background sweeper interval
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Bound on the score-snapshot ring
    #[serde(default = "default_score_history_cap")]
    pub score_history_cap: usize,
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

fn default_score_history_cap() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            score_history_cap: default_score_history_cap(),
        }
    }
}

/// SMS compliance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_sms_limit: u32,
    #[serde(default = "default_monthly_limit")]
    pub monthly_sms_limit: u32,
    /// Start of the business-hours window (local hour, inclusive)
    #[serde(default = "default_business_start")]
    pub business_hours_start: u32,
    /// End of the business-hours window (local hour, inclusive)
    #[serde(default = "default_business_end")]
    pub business_hours_end: u32,
    /// Whole-token STOP keywords (matched against uppercased input)
    #[serde(default = "default_stop_keywords")]
    pub stop_keywords: Vec<String>,
    /// Opt-outs are retained at least this long
    #[serde(default = "default_opt_out_retention_days")]
    pub opt_out_retention_days: u32,
    /// JSONL audit journal path; None keeps the journal in memory only
    #[serde(default)]
    pub journal_path: Option<String>,
}

fn default_daily_limit() -> u32 {
    3
}

fn default_monthly_limit() -> u32 {
    20
}

fn default_business_start() -> u32 {
    8
}

fn default_business_end() -> u32 {
    21
}

fn default_stop_keywords() -> Vec<String> {
    [
        "STOP",
        "UNSUBSCRIBE",
        "QUIT",
        "CANCEL",
        "END",
        "REMOVE",
        "HALT",
        "OPT-OUT",
        "OPTOUT",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_opt_out_retention_days() -> u32 {
    730
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            daily_sms_limit: default_daily_limit(),
            monthly_sms_limit: default_monthly_limit(),
            business_hours_start: default_business_start(),
            business_hours_end: default_business_end(),
            stop_keywords: default_stop_keywords(),
            opt_out_retention_days: default_opt_out_retention_days(),
            journal_path: None,
        }
    }
}

/// Intent scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// FRS pillar weights; must sum to 1.0
    #[serde(default)]
    pub frs_weights: FrsWeights,
    #[serde(default = "default_hot")]
    pub hot_threshold: f64,
    #[serde(default = "default_warm")]
    pub warm_threshold: f64,
    #[serde(default = "default_lukewarm")]
    pub lukewarm_threshold: f64,
}

fn default_hot() -> f64 {
    75.0
}

fn default_warm() -> f64 {
    50.0
}

fn default_lukewarm() -> f64 {
    25.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            frs_weights: FrsWeights::default(),
            hot_threshold: default_hot(),
            warm_threshold: default_warm(),
            lukewarm_threshold: default_lukewarm(),
        }
    }
}

/// Qualification-gate and handoff thresholds (inclusive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    #[serde(default = "default_frs_min")]
    pub frs_min: f64,
    #[serde(default = "default_confidence_min")]
    pub confidence_min: f64,
}

fn default_frs_min() -> f64 {
    60.0
}

fn default_confidence_min() -> f64 {
    0.70
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            frs_min: default_frs_min(),
            confidence_min: default_confidence_min(),
        }
    }
}

/// Deadlines for collaborator calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    #[serde(default = "default_llm_deadline_secs")]
    pub llm_secs: u64,
    #[serde(default = "default_crm_deadline_secs")]
    pub crm_secs: u64,
    #[serde(default = "default_cma_deadline_secs")]
    pub cma_secs: u64,
}

fn default_llm_deadline_secs() -> u64 {
    10
}

fn default_crm_deadline_secs() -> u64 {
    5
}

fn default_cma_deadline_secs() -> u64 {
    30
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            llm_secs: default_llm_deadline_secs(),
            crm_secs: default_crm_deadline_secs(),
            cma_secs: default_cma_deadline_secs(),
        }
    }
}

/// LLM collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.1:8b-instruct-q4_K_M".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_retries() -> u32 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

/// CRM collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Tenant/location identifier for contact queries
    #[serde(default)]
    pub location_id: String,
}

fn default_crm_base_url() -> String {
    "http://localhost:9090".to_string()
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: default_crm_base_url(),
            api_key: None,
            location_id: String::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_filter() -> String {
    "info,leadflow=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings. Called once at startup; any failure is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_scoring()?;
        self.validate_compliance()?;
        self.validate_session()?;
        self.validate_handoff()?;
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        let sum = self.scoring.frs_weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::InvalidValue {
                field: "scoring.frs_weights".to_string(),
                message: format!("weights must sum to 1.0, got {sum}"),
            });
        }

        let s = &self.scoring;
        if !(s.hot_threshold > s.warm_threshold
            && s.warm_threshold > s.lukewarm_threshold
            && s.lukewarm_threshold > 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: "scoring".to_string(),
                message: format!(
                    "classification thresholds must be strictly descending and positive \
                     (hot={}, warm={}, lukewarm={})",
                    s.hot_threshold, s.warm_threshold, s.lukewarm_threshold
                ),
            });
        }
        Ok(())
    }

    fn validate_compliance(&self) -> Result<(), ConfigError> {
        let c = &self.compliance;
        if c.daily_sms_limit == 0 || c.monthly_sms_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "compliance".to_string(),
                message: "SMS limits must be positive".to_string(),
            });
        }
        if c.daily_sms_limit > c.monthly_sms_limit {
            return Err(ConfigError::InvalidValue {
                field: "compliance.daily_sms_limit".to_string(),
                message: "daily limit cannot exceed monthly limit".to_string(),
            });
        }
        if c.business_hours_start >= c.business_hours_end || c.business_hours_end > 23 {
            return Err(ConfigError::InvalidValue {
                field: "compliance.business_hours".to_string(),
                message: format!(
                    "invalid hour range {}..={}",
                    c.business_hours_start, c.business_hours_end
                ),
            });
        }
        if c.stop_keywords.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compliance.stop_keywords".to_string(),
                message: "at least one STOP keyword is required".to_string(),
            });
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.ttl_secs".to_string(),
                message: "session TTL must be positive".to_string(),
            });
        }
        if self.session.score_history_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.score_history_cap".to_string(),
                message: "score history cap must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn validate_handoff(&self) -> Result<(), ConfigError> {
        let h = &self.handoff;
        if !(0.0..=100.0).contains(&h.frs_min) {
            return Err(ConfigError::InvalidValue {
                field: "handoff.frs_min".to_string(),
                message: format!("must be within 0..=100, got {}", h.frs_min),
            });
        }
        if !(0.0..=1.0).contains(&h.confidence_min) {
            return Err(ConfigError::InvalidValue {
                field: "handoff.confidence_min".to_string(),
                message: format!("must be within 0..=1, got {}", h.confidence_min),
            });
        }
        Ok(())
    }
}

/// Load settings from an optional file plus LEADFLOW_-prefixed environment
/// variables, then validate.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(Environment::with_prefix("LEADFLOW").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    tracing::info!(
        daily_limit = settings.compliance.daily_sms_limit,
        monthly_limit = settings.compliance.monthly_sms_limit,
        session_ttl_secs = settings.session.ttl_secs,
        "settings loaded"
    );

    Ok(settings)
}
