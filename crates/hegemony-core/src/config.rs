//! Configuration loading and typed config structures for the coordinator.
//!
//! The canonical configuration lives in `hegemony-config.yaml` at the
//! project root. Every section and field has a default, so an empty file
//! (or no file) yields a runnable coordinator on the built-in campaign.

use std::path::{Path, PathBuf};

use hegemony_db::StoreConfig;
use hegemony_factions::{DecisionConfig, LearningConfig};
use hegemony_world::CascadeConfig;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level coordinator configuration.
///
/// Mirrors the structure of `hegemony-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoordinatorConfig {
    /// Cycle budget, intervals, and load thresholds.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Opportunity scoring and strategy constants.
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Rolling window and learning channel.
    #[serde(default)]
    pub learning: LearningConfig,

    /// Cascade propagation constants.
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// Outcome resolution constants.
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Broadcast hub limits.
    #[serde(default)]
    pub hub: HubConfig,

    /// Persistence backends and write path.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP bind address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log filter and format.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Campaign seed source and RNG seed.
    #[serde(default)]
    pub campaign: CampaignConfig,
}

impl CoordinatorConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `store.database_url`
    /// - `DRAGONFLY_URL` overrides `store.dragonfly_url`
    /// - `HEGEMONY_PORT` overrides `server.port`
    /// - `HEGEMONY_CYCLE_BUDGET_MS` overrides `scheduler.cycle_budget_ms`
    /// - `HEGEMONY_MAX_QUEUE_DEPTH` overrides `scheduler.max_queue_depth`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from `path` when it exists, otherwise defaults plus env
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file fails to load.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Self::parse("")
    }

    /// Override fields from the environment when the variables are set.
    pub fn apply_env_overrides(&mut self) {
        self.store.apply_env_overrides();
        if let Some(port) = env_parse::<u16>("HEGEMONY_PORT") {
            self.server.port = port;
        }
        if let Some(budget) = env_parse::<u64>("HEGEMONY_CYCLE_BUDGET_MS") {
            self.scheduler.cycle_budget_ms = budget;
        }
        if let Some(depth) = env_parse::<usize>("HEGEMONY_MAX_QUEUE_DEPTH") {
            self.scheduler.max_queue_depth = depth;
        }
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.shards == 0 {
            return Err(invalid("scheduler.shards", "must be at least 1"));
        }
        if s.max_queue_depth == 0 {
            return Err(invalid("scheduler.max_queue_depth", "must be at least 1"));
        }
        if s.min_interval_ms > s.max_interval_ms {
            return Err(invalid(
                "scheduler.min_interval_ms",
                "must not exceed scheduler.max_interval_ms",
            ));
        }
        if !(s.pressure_multiplier.is_finite() && s.pressure_multiplier >= 1.0) {
            return Err(invalid(
                "scheduler.pressure_multiplier",
                "must be a finite value of at least 1",
            ));
        }
        if !is_unit(s.high_water) {
            return Err(invalid("scheduler.high_water", "must be within [0, 1]"));
        }
        if !is_unit(s.low_water) {
            return Err(invalid("scheduler.low_water", "must be within [0, 1]"));
        }
        let w = s.load_weights;
        for (field, weight) in [
            ("scheduler.load_weights.cpu", w.cpu),
            ("scheduler.load_weights.memory", w.memory),
            ("scheduler.load_weights.connections", w.connections),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(invalid(field, "must be finite and not negative"));
            }
        }
        if s.low_water >= s.high_water {
            return Err(invalid(
                "scheduler.low_water",
                "must be below scheduler.high_water",
            ));
        }
        if self.learning.window_capacity == 0 {
            return Err(invalid("learning.window_capacity", "must be at least 1"));
        }
        if !is_unit(self.cascade.decay) {
            return Err(invalid("cascade.decay", "must be within [0, 1]"));
        }
        if !is_unit(self.cascade.min_probability) {
            return Err(invalid("cascade.min_probability", "must be within [0, 1]"));
        }
        let b = self.cascade.base_probability;
        for (field, probability) in [
            ("cascade.base_probability.control_loss", b.control_loss),
            ("cascade.base_probability.strategic_node_loss", b.strategic_node_loss),
            ("cascade.base_probability.resource_depletion", b.resource_depletion),
            ("cascade.base_probability.alliance_collapse", b.alliance_collapse),
        ] {
            if !is_unit(probability) {
                return Err(invalid(field, "must be within [0, 1]"));
            }
        }
        let r = &self.resolution;
        for (field, value) in [
            ("resolution.base_success", r.base_success),
            ("resolution.priority_weight", r.priority_weight),
            ("resolution.risk_weight", r.risk_weight),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, "must be finite"));
            }
        }
        if r.challenge_cycles == 0 {
            return Err(invalid("resolution.challenge_cycles", "must be at least 1"));
        }
        if !(is_unit(r.min_success) && is_unit(r.max_success) && r.min_success <= r.max_success) {
            return Err(invalid(
                "resolution.min_success",
                "min_success and max_success must be within [0, 1], min first",
            ));
        }
        if self.hub.queue_capacity == 0 {
            return Err(invalid("hub.queue_capacity", "must be at least 1"));
        }
        if self.store.write_timeout_ms == 0 {
            return Err(invalid("store.write_timeout_ms", "must be at least 1"));
        }
        Ok(())
    }
}

/// Finite and within `[0, 1]`; NaN fails.
fn is_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchedulerConfig {
    /// Number of shard schedulers; factions map to `id % shards`.
    #[serde(default = "default_shards")]
    pub shards: u32,

    /// Wall-clock budget for one cycle.
    #[serde(default = "default_cycle_budget_ms")]
    pub cycle_budget_ms: u64,

    /// Deadline handed to each decision task.
    #[serde(default = "default_task_deadline_ms")]
    pub task_deadline_ms: u64,

    /// Queue capacity per shard; enqueues beyond it are rejected.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,

    /// Shortest interval between cycles.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Longest interval between cycles.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Interval multiplier while the hub reports connection pressure.
    #[serde(default = "default_pressure_multiplier")]
    pub pressure_multiplier: f64,

    /// Load score above which a cycle counts toward throttling.
    #[serde(default = "default_high_water")]
    pub high_water: f64,

    /// Load score below which a throttled shard returns to idle.
    #[serde(default = "default_low_water")]
    pub low_water: f64,

    /// Consecutive high-load cycles before throttling.
    #[serde(default = "default_sustained_cycles")]
    pub sustained_cycles: u32,

    /// Cycles a draining shard may run before giving up on queued tasks.
    #[serde(default = "default_drain_max_cycles")]
    pub drain_max_cycles: u32,

    /// Enqueue every faction of the shard before each cycle.
    #[serde(default = "default_true")]
    pub auto_enqueue: bool,

    /// Host sampling period for the load gauge.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Weight of each load signal in the load score.
    #[serde(default)]
    pub load_weights: LoadWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            cycle_budget_ms: default_cycle_budget_ms(),
            task_deadline_ms: default_task_deadline_ms(),
            max_queue_depth: default_max_queue_depth(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            pressure_multiplier: default_pressure_multiplier(),
            high_water: default_high_water(),
            low_water: default_low_water(),
            sustained_cycles: default_sustained_cycles(),
            drain_max_cycles: default_drain_max_cycles(),
            auto_enqueue: true,
            sample_interval_ms: default_sample_interval_ms(),
            load_weights: LoadWeights::default(),
        }
    }
}

/// Relative weights of CPU, memory, and connections in the load score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LoadWeights {
    /// Host CPU utilisation.
    #[serde(default = "default_cpu_weight")]
    pub cpu: f64,
    /// Host memory utilisation.
    #[serde(default = "default_memory_weight")]
    pub memory: f64,
    /// Active connections relative to the hub's high threshold.
    #[serde(default = "default_connection_weight")]
    pub connections: f64,
}

impl Default for LoadWeights {
    fn default() -> Self {
        Self {
            cpu: default_cpu_weight(),
            memory: default_memory_weight(),
            connections: default_connection_weight(),
        }
    }
}

/// Outcome resolution configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolutionConfig {
    /// Success probability before priority and risk adjustments.
    #[serde(default = "default_base_success")]
    pub base_success: f64,
    /// Weight of the decision's priority.
    #[serde(default = "default_priority_weight")]
    pub priority_weight: f64,
    /// Weight of the decision's risk.
    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,
    /// Lower clamp on success probability.
    #[serde(default = "default_min_success")]
    pub min_success: f64,
    /// Upper clamp on success probability.
    #[serde(default = "default_max_success")]
    pub max_success: f64,
    /// Influence per action on success.
    #[serde(default)]
    pub influence: InfluenceTable,
    /// Influence lost on any failure.
    #[serde(default = "default_failure_influence")]
    pub failure_influence: i64,
    /// Strength an attacker gains on victory.
    #[serde(default = "default_victory_strength")]
    pub victory_strength: i64,
    /// Strength lost by the loser of an attack.
    #[serde(default = "default_defeat_strength")]
    pub defeat_strength: i64,
    /// Strength gained by a successful fortify or defend.
    #[serde(default = "default_fortify_strength")]
    pub fortify_strength: i64,
    /// Cycles a contested flag lasts without a renewed challenge.
    #[serde(default = "default_challenge_cycles")]
    pub challenge_cycles: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            base_success: default_base_success(),
            priority_weight: default_priority_weight(),
            risk_weight: default_risk_weight(),
            min_success: default_min_success(),
            max_success: default_max_success(),
            influence: InfluenceTable::default(),
            failure_influence: default_failure_influence(),
            victory_strength: default_victory_strength(),
            defeat_strength: default_defeat_strength(),
            fortify_strength: default_fortify_strength(),
            challenge_cycles: default_challenge_cycles(),
        }
    }
}

/// Influence gained per successful action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InfluenceTable {
    /// Successful expand.
    #[serde(default = "default_expand_influence")]
    pub expand: i64,
    /// Successful attack.
    #[serde(default = "default_attack_influence")]
    pub attack: i64,
    /// Successful fortify or defend.
    #[serde(default = "default_hold_influence")]
    pub hold: i64,
    /// Successful patrol.
    #[serde(default = "default_patrol_influence")]
    pub patrol: i64,
    /// Successful negotiation.
    #[serde(default = "default_negotiate_influence")]
    pub negotiate: i64,
    /// Retreat (negative: ground is given up).
    #[serde(default = "default_retreat_influence")]
    pub retreat: i64,
}

impl Default for InfluenceTable {
    fn default() -> Self {
        Self {
            expand: default_expand_influence(),
            attack: default_attack_influence(),
            hold: default_hold_influence(),
            patrol: default_patrol_influence(),
            negotiate: default_negotiate_influence(),
            retreat: default_retreat_influence(),
        }
    }
}

/// Broadcast hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Outbound queue capacity per connection.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Sessions idle longer than this are closed by the reaper.
    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
    /// How often the reaper runs.
    #[serde(default = "default_reap_interval_ms")]
    pub reap_interval_ms: u64,
    /// Active connections at which connection pressure is raised.
    #[serde(default = "default_high_connections")]
    pub high_connections: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            inactivity_timeout_ms: default_inactivity_timeout_ms(),
            reap_interval_ms: default_reap_interval_ms(),
            high_connections: default_high_connections(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error, or a full
    /// `EnvFilter` directive). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Campaign configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CampaignConfig {
    /// Campaign seed file. `None` uses the built-in campaign.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Seed for outcome resolution and cascade realization.
    #[serde(default = "default_rng_seed")]
    pub rng_seed: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            path: None,
            rng_seed: default_rng_seed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_shards() -> u32 {
    2
}

const fn default_cycle_budget_ms() -> u64 {
    16
}

const fn default_task_deadline_ms() -> u64 {
    8
}

const fn default_max_queue_depth() -> usize {
    256
}

const fn default_min_interval_ms() -> u64 {
    50
}

const fn default_max_interval_ms() -> u64 {
    1000
}

const fn default_pressure_multiplier() -> f64 {
    1.5
}

const fn default_high_water() -> f64 {
    0.85
}

const fn default_low_water() -> f64 {
    0.5
}

const fn default_sustained_cycles() -> u32 {
    3
}

const fn default_drain_max_cycles() -> u32 {
    10
}

const fn default_sample_interval_ms() -> u64 {
    1000
}

const fn default_cpu_weight() -> f64 {
    0.4
}

const fn default_memory_weight() -> f64 {
    0.3
}

const fn default_connection_weight() -> f64 {
    0.3
}

const fn default_base_success() -> f64 {
    0.5
}

const fn default_priority_weight() -> f64 {
    0.4
}

const fn default_risk_weight() -> f64 {
    0.5
}

const fn default_min_success() -> f64 {
    0.05
}

const fn default_max_success() -> f64 {
    0.95
}

const fn default_failure_influence() -> i64 {
    -3
}

const fn default_victory_strength() -> i64 {
    3
}

const fn default_defeat_strength() -> i64 {
    8
}

const fn default_fortify_strength() -> i64 {
    2
}

const fn default_challenge_cycles() -> u64 {
    10
}

const fn default_expand_influence() -> i64 {
    10
}

const fn default_attack_influence() -> i64 {
    15
}

const fn default_hold_influence() -> i64 {
    5
}

const fn default_patrol_influence() -> i64 {
    2
}

const fn default_negotiate_influence() -> i64 {
    8
}

const fn default_retreat_influence() -> i64 {
    -2
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_inactivity_timeout_ms() -> u64 {
    60_000
}

const fn default_reap_interval_ms() -> u64 {
    5_000
}

const fn default_high_connections() -> u64 {
    100
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_rng_seed() -> u64 {
    42
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.cycle_budget_ms, 16);
        assert_eq!(config.scheduler.task_deadline_ms, 8);
        assert_eq!(config.learning.window_capacity, 50);
        assert_eq!(config.cascade.max_depth, 3);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
scheduler:
  shards: 4
  cycle_budget_ms: 20
decision:
  attack_strength_threshold: 70
cascade:
  base_probability:
    control_loss: 0.5
hub:
  high_connections: 250
campaign:
  path: campaigns/archipelago.yaml
";
        let config = CoordinatorConfig::parse_without_env(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.unwrap_or_default();
        assert_eq!(config.scheduler.shards, 4);
        assert_eq!(config.scheduler.cycle_budget_ms, 20);
        assert_eq!(config.scheduler.max_queue_depth, 256);
        assert_eq!(config.decision.attack_strength_threshold, 70);
        assert!((config.cascade.base_probability.control_loss - 0.5).abs() < f64::EPSILON);
        assert!((config.cascade.base_probability.strategic_node_loss - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.hub.high_connections, 250);
        assert_eq!(
            config.campaign.path.as_deref(),
            Some(Path::new("campaigns/archipelago.yaml"))
        );
    }

    #[test]
    fn parse_empty_yaml() {
        let config = CoordinatorConfig::parse_without_env("");
        assert!(config.is_ok_and(|c| c == CoordinatorConfig::default()));
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut config = CoordinatorConfig::default();
        config.scheduler.shards = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "scheduler.shards",
                ..
            })
        ));

        let mut config = CoordinatorConfig::default();
        config.scheduler.min_interval_ms = 2_000;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.scheduler.low_water = 0.9;
        assert!(config.validate().is_err());
    }

    fn rejected_field(config: &CoordinatorConfig) -> Option<&'static str> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn non_finite_pressure_multiplier_is_rejected() {
        let config = CoordinatorConfig::parse_without_env("scheduler:\n  pressure_multiplier: .inf\n");
        let config = config.unwrap_or_default();
        assert!(config.scheduler.pressure_multiplier.is_infinite());
        assert_eq!(rejected_field(&config), Some("scheduler.pressure_multiplier"));

        let mut config = CoordinatorConfig::default();
        config.scheduler.pressure_multiplier = f64::NAN;
        assert_eq!(rejected_field(&config), Some("scheduler.pressure_multiplier"));

        config.scheduler.pressure_multiplier = 0.5;
        assert_eq!(rejected_field(&config), Some("scheduler.pressure_multiplier"));
    }

    #[test]
    fn bad_load_weights_are_rejected() {
        let mut config = CoordinatorConfig::default();
        config.scheduler.load_weights.memory = -0.1;
        assert_eq!(rejected_field(&config), Some("scheduler.load_weights.memory"));

        let mut config = CoordinatorConfig::default();
        config.scheduler.load_weights.cpu = f64::INFINITY;
        assert_eq!(rejected_field(&config), Some("scheduler.load_weights.cpu"));

        let mut config = CoordinatorConfig::default();
        config.scheduler.high_water = f64::NAN;
        assert_eq!(rejected_field(&config), Some("scheduler.high_water"));
    }

    #[test]
    fn zero_write_timeout_is_rejected() {
        let mut config = CoordinatorConfig::default();
        config.store.write_timeout_ms = 0;
        assert_eq!(rejected_field(&config), Some("store.write_timeout_ms"));
    }

    #[test]
    fn bad_probabilities_are_rejected() {
        let mut config = CoordinatorConfig::default();
        config.cascade.base_probability.strategic_node_loss = 1.5;
        assert_eq!(
            rejected_field(&config),
            Some("cascade.base_probability.strategic_node_loss")
        );

        let mut config = CoordinatorConfig::default();
        config.cascade.base_probability.control_loss = -0.2;
        assert_eq!(
            rejected_field(&config),
            Some("cascade.base_probability.control_loss")
        );

        let mut config = CoordinatorConfig::default();
        config.cascade.min_probability = f64::NAN;
        assert_eq!(rejected_field(&config), Some("cascade.min_probability"));

        let mut config = CoordinatorConfig::default();
        config.resolution.min_success = 0.9;
        config.resolution.max_success = 0.1;
        assert_eq!(rejected_field(&config), Some("resolution.min_success"));

        let mut config = CoordinatorConfig::default();
        config.resolution.risk_weight = f64::NAN;
        assert_eq!(rejected_field(&config), Some("resolution.risk_weight"));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("hegemony-config.yaml");
        if path.exists() {
            let config = CoordinatorConfig::parse_without_env(
                &std::fs::read_to_string(&path).unwrap_or_default(),
            );
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            assert!(config.is_ok_and(|c| c.validate().is_ok()));
        }
    }
}
