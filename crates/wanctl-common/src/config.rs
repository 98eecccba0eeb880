//! Config schema: the raw on-disk shape plus validated, invariant-checked
//! types. Validation happens once at load time — the tagged 3-state/
//! 4-state choice for the rate controller is resolved here into a plain
//! enum, not re-derived per tick.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Raw on-disk shape of one WAN's config file, deserialized permissively:
/// unknown keys are reported
/// by [`warn_unknown_keys`] but never fail parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct WanFile {
    pub wan_name: String,
    #[serde(default)]
    pub primary: bool,
    pub router: RouterRaw,
    pub queues: QueuesRaw,
    pub continuous_monitoring: ContinuousMonitoringRaw,
    #[serde(default)]
    pub steering: Option<SteeringRaw>,
    pub state: StateRaw,
    #[serde(default)]
    pub logging: Option<LoggingRaw>,
    #[serde(default)]
    pub lock_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterRaw {
    pub transport: String,
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueuesRaw {
    pub download: String,
    pub upload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContinuousMonitoringRaw {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub baseline_rtt_initial: f64,
    pub ping_hosts: Vec<String>,
    #[serde(default)]
    pub use_median_of_three: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    pub download: DirectionRatesRaw,
    pub upload: DirectionRatesRaw,
    pub thresholds: ThresholdsRaw,
    #[serde(default)]
    pub fallback_checks: Option<FallbackChecksRaw>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionRatesRaw {
    pub floor_green_mbps: f64,
    pub floor_yellow_mbps: f64,
    #[serde(default)]
    pub floor_soft_red_mbps: Option<f64>,
    pub floor_red_mbps: f64,
    pub ceiling_mbps: f64,
    pub step_up_mbps: f64,
    pub factor_down: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdsRaw {
    pub target_bloat_ms: f64,
    pub warn_bloat_ms: f64,
    #[serde(default)]
    pub hard_red_bloat_ms: Option<f64>,
    pub alpha_baseline: f64,
    pub alpha_load: f64,
    #[serde(default = "default_baseline_update_threshold")]
    pub baseline_update_threshold_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackChecksRaw {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_mode")]
    pub mode: String,
    #[serde(default = "default_max_fallback_cycles")]
    pub max_fallback_cycles: u32,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default)]
    pub tcp_targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteeringRaw {
    #[serde(default)]
    pub enabled: bool,
    pub rule_id: String,
    #[serde(default = "default_bad_samples_required")]
    pub bad_samples_required: u32,
    #[serde(default = "default_good_samples_required")]
    pub good_samples_required: u32,
    pub thresholds: SteeringThresholdsRaw,
    pub ewma: SteeringEwmaRaw,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteeringThresholdsRaw {
    pub green_rtt_ms: f64,
    pub yellow_rtt_ms: f64,
    pub red_rtt_ms: f64,
    pub min_drops_red: u64,
    pub min_queue_red: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteeringEwmaRaw {
    pub alpha_rtt: f64,
    pub alpha_queue: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateRaw {
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingRaw {
    #[serde(default)]
    pub main_log: Option<String>,
    #[serde(default)]
    pub debug_log: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_interval_ms() -> u64 {
    50
}
fn default_baseline_update_threshold() -> f64 {
    3.0
}
fn default_fallback_mode() -> String {
    "graceful_degradation".to_string()
}
fn default_max_fallback_cycles() -> u32 {
    3
}
fn default_bad_samples_required() -> u32 {
    320
}
fn default_good_samples_required() -> u32 {
    600
}

/// The known top-level and nested keys, used only to emit warnings for
/// unrecognized keys. Unknown keys produce a warning but never fail
/// startup. Kept as plain slices rather than a derive — this is
/// advisory, not a schema.
const TOP_LEVEL_KEYS: &[&str] = &[
    "wan_name",
    "primary",
    "router",
    "queues",
    "continuous_monitoring",
    "steering",
    "state",
    "logging",
    "lock_file",
];

const ROUTER_KEYS: &[&str] = &[
    "transport",
    "host",
    "user",
    "password",
    "port",
    "verify_ssl",
    "ssh_key",
];

const MONITORING_KEYS: &[&str] = &[
    "enabled",
    "baseline_rtt_initial",
    "ping_hosts",
    "use_median_of_three",
    "interval_ms",
    "download",
    "upload",
    "thresholds",
    "fallback_checks",
];

/// Walk the raw YAML value and log a warning for any key outside the
/// documented schema. Best-effort: only the sections we know the shape of
/// are checked, everything else parses silently.
pub fn warn_unknown_keys(path: &str, value: &serde_yaml::Value) {
    warn_mapping(path, "<root>", value, TOP_LEVEL_KEYS);
    if let Some(router) = value.get("router") {
        warn_mapping(path, "router", router, ROUTER_KEYS);
    }
    if let Some(cm) = value.get("continuous_monitoring") {
        warn_mapping(path, "continuous_monitoring", cm, MONITORING_KEYS);
    }
}

fn warn_mapping(path: &str, section: &str, value: &serde_yaml::Value, known: &[&str]) {
    let Some(mapping) = value.as_mapping() else {
        return;
    };
    for key in mapping.keys() {
        let Some(key) = key.as_str() else { continue };
        if !known.contains(&key) {
            tracing::warn!(
                file = path,
                section,
                key,
                "unrecognized config key (ignored)"
            );
        }
    }
}

/// Whether the rate controller for a WAN uses the 3-state or 4-state FSM.
///
/// Selected once at load time from the presence of `floor_soft_red_mbps`
/// and `hard_red_bloat_ms`: a tagged variant fixed at config load, not
/// re-derived per tick by runtime reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmKind {
    ThreeState,
    FourState { hard_red_bloat_ms_bits: u64 },
}

impl FsmKind {
    pub fn hard_red_bloat_ms(&self) -> Option<f64> {
        match self {
            FsmKind::ThreeState => None,
            FsmKind::FourState {
                hard_red_bloat_ms_bits,
            } => Some(f64::from_bits(*hard_red_bloat_ms_bits)),
        }
    }

    pub fn is_four_state(&self) -> bool {
        matches!(self, FsmKind::FourState { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionFloors {
    pub green: f64,
    pub yellow: f64,
    pub soft_red: Option<f64>,
    pub red: f64,
    pub ceiling: f64,
    pub step_up: f64,
    pub factor_down: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub target_bloat_ms: f64,
    pub warn_bloat_ms: f64,
    pub hard_red_bloat_ms: Option<f64>,
    pub alpha_baseline: f64,
    pub alpha_load: f64,
    pub baseline_update_threshold_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Rest,
    Ssh,
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub kind: TransportKind,
    pub host: String,
    pub user: Option<String>,
    /// Password with any `${VAR}` reference already resolved from the
    /// environment.
    pub password: Option<String>,
    pub port: u16,
    pub verify_ssl: bool,
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum FallbackMode {
    Freeze,
    UseLastRtt,
    GracefulDegradation,
}

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub mode: FallbackMode,
    pub max_fallback_cycles: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            enabled: true,
            mode: FallbackMode::GracefulDegradation,
            max_fallback_cycles: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SteeringConfig {
    pub enabled: bool,
    pub rule_id: String,
    pub bad_samples_required: u32,
    pub good_samples_required: u32,
    pub green_rtt_ms: f64,
    pub yellow_rtt_ms: f64,
    pub red_rtt_ms: f64,
    pub min_drops_red: u64,
    pub min_queue_red: u64,
    pub alpha_rtt: f64,
    pub alpha_queue: f64,
}

/// A fully validated, invariant-checked config for one WAN.
///
/// Constructed only via [`ValidatedWanConfig::from_raw`], which enforces
/// every ordering invariant: floors ascending into the
/// ceiling, thresholds strictly ordered, alphas in `(0, 1)` with
/// `alpha_baseline < alpha_load`, and `0 < factor_down < 1`.
#[derive(Debug, Clone)]
pub struct ValidatedWanConfig {
    pub wan_name: String,
    pub primary: bool,
    pub router: RouterConfig,
    pub download_queue: String,
    pub upload_queue: String,
    pub monitoring_enabled: bool,
    pub baseline_rtt_initial: f64,
    pub ping_hosts: Vec<String>,
    pub use_median_of_three: bool,
    pub interval_ms: u64,
    pub download: DirectionFloors,
    pub upload: DirectionFloors,
    pub thresholds: Thresholds,
    pub fsm_kind: FsmKind,
    pub fallback: FallbackConfig,
    pub steering: Option<SteeringConfig>,
    pub state_dir: String,
}

impl ValidatedWanConfig {
    pub fn from_raw(raw: WanFile) -> Result<Self, ConfigError> {
        let kind = match raw.router.transport.as_str() {
            "rest" => TransportKind::Rest,
            "ssh" => TransportKind::Ssh,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "router.transport".into(),
                    reason: format!("expected 'rest' or 'ssh', got '{other}'"),
                })
            }
        };
        let default_port = match kind {
            TransportKind::Rest => 443,
            TransportKind::Ssh => 22,
        };
        let password = resolve_env_ref(raw.router.password)?;

        let router = RouterConfig {
            kind,
            host: raw.router.host,
            user: raw.router.user,
            password,
            port: raw.router.port.unwrap_or(default_port),
            verify_ssl: raw.router.verify_ssl,
            ssh_key: raw.router.ssh_key,
        };

        let cm = raw.continuous_monitoring;
        let download = validate_direction_floors("download", cm.download)?;
        let upload = validate_direction_floors("upload", cm.upload)?;

        let fsm_kind = match (download.soft_red, cm.thresholds.hard_red_bloat_ms) {
            (Some(_), Some(hard)) => FsmKind::FourState {
                hard_red_bloat_ms_bits: hard.to_bits(),
            },
            (None, None) => FsmKind::ThreeState,
            (Some(_), None) => {
                return Err(ConfigError::InvalidValue {
                    key: "thresholds.hard_red_bloat_ms".into(),
                    reason: "floor_soft_red_mbps is set but hard_red_bloat_ms is missing".into(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    key: "download.floor_soft_red_mbps".into(),
                    reason: "hard_red_bloat_ms is set but floor_soft_red_mbps is missing".into(),
                })
            }
        };

        let thresholds = validate_thresholds(cm.thresholds, fsm_kind)?;

        let fallback = match cm.fallback_checks {
            None => FallbackConfig::default(),
            Some(raw_fb) => FallbackConfig {
                enabled: raw_fb.enabled,
                mode: match raw_fb.mode.as_str() {
                    "freeze" => FallbackMode::Freeze,
                    "use_last_rtt" => FallbackMode::UseLastRtt,
                    "graceful_degradation" => FallbackMode::GracefulDegradation,
                    other => {
                        return Err(ConfigError::InvalidValue {
                            key: "fallback_checks.mode".into(),
                            reason: format!("unknown mode '{other}'"),
                        })
                    }
                },
                max_fallback_cycles: raw_fb.max_fallback_cycles,
            },
        };

        let steering = match raw.steering {
            None => None,
            Some(s) => Some(SteeringConfig {
                enabled: s.enabled,
                rule_id: s.rule_id,
                bad_samples_required: s.bad_samples_required,
                good_samples_required: s.good_samples_required,
                green_rtt_ms: s.thresholds.green_rtt_ms,
                yellow_rtt_ms: s.thresholds.yellow_rtt_ms,
                red_rtt_ms: s.thresholds.red_rtt_ms,
                min_drops_red: s.thresholds.min_drops_red,
                min_queue_red: s.thresholds.min_queue_red,
                alpha_rtt: s.ewma.alpha_rtt,
                alpha_queue: s.ewma.alpha_queue,
            }),
        };

        if cm.ping_hosts.is_empty() {
            return Err(ConfigError::MissingKey(
                "continuous_monitoring.ping_hosts".into(),
            ));
        }

        Ok(ValidatedWanConfig {
            wan_name: raw.wan_name,
            primary: raw.primary,
            router,
            download_queue: raw.queues.download,
            upload_queue: raw.queues.upload,
            monitoring_enabled: cm.enabled,
            baseline_rtt_initial: cm.baseline_rtt_initial,
            ping_hosts: cm.ping_hosts,
            use_median_of_three: cm.use_median_of_three,
            interval_ms: cm.interval_ms,
            download,
            upload,
            thresholds,
            fsm_kind,
            fallback,
            steering,
            state_dir: raw.state.dir,
        })
    }

    /// Load, parse, and validate a single WAN config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path_str.clone(),
                source: e,
            })?;
        warn_unknown_keys(&path_str, &value);
        let raw: WanFile = serde_yaml::from_value(value).map_err(|e| ConfigError::Parse {
            path: path_str.clone(),
            source: e,
        })?;
        Self::from_raw(raw)
    }
}

fn validate_direction_floors(
    direction: &str,
    raw: DirectionRatesRaw,
) -> Result<DirectionFloors, ConfigError> {
    let floors = DirectionFloors {
        green: raw.floor_green_mbps,
        yellow: raw.floor_yellow_mbps,
        soft_red: raw.floor_soft_red_mbps,
        red: raw.floor_red_mbps,
        ceiling: raw.ceiling_mbps,
        step_up: raw.step_up_mbps,
        factor_down: raw.factor_down,
    };

    if !(0.0 < floors.factor_down && floors.factor_down < 1.0) {
        return Err(ConfigError::FactorDownOutOfRange(floors.factor_down));
    }

    let ascending = match floors.soft_red {
        Some(soft_red) => floors.red <= soft_red && soft_red <= floors.yellow,
        None => floors.red <= floors.yellow,
    };
    if !(ascending && floors.yellow <= floors.green && floors.green <= floors.ceiling) {
        return Err(ConfigError::FloorOrdering {
            direction: direction.to_string(),
            detail: format!(
                "expected floor_red <= floor_soft_red? <= floor_yellow <= floor_green <= ceiling, got {floors:?}"
            ),
        });
    }

    Ok(floors)
}

fn validate_thresholds(raw: ThresholdsRaw, fsm_kind: FsmKind) -> Result<Thresholds, ConfigError> {
    if !(0.0 < raw.target_bloat_ms && raw.target_bloat_ms < raw.warn_bloat_ms) {
        return Err(ConfigError::ThresholdOrdering(
            "expected 0 < target_bloat_ms < warn_bloat_ms".into(),
        ));
    }
    if let Some(hard) = raw.hard_red_bloat_ms {
        if !(raw.warn_bloat_ms < hard) {
            return Err(ConfigError::ThresholdOrdering(
                "expected warn_bloat_ms < hard_red_bloat_ms".into(),
            ));
        }
    }
    if !(0.0 < raw.alpha_baseline && raw.alpha_baseline < raw.alpha_load && raw.alpha_load < 1.0) {
        return Err(ConfigError::AlphaOutOfRange(format!(
            "expected 0 < alpha_baseline ({}) < alpha_load ({}) < 1",
            raw.alpha_baseline, raw.alpha_load
        )));
    }

    Ok(Thresholds {
        target_bloat_ms: raw.target_bloat_ms,
        warn_bloat_ms: raw.warn_bloat_ms,
        hard_red_bloat_ms: fsm_kind.hard_red_bloat_ms(),
        alpha_baseline: raw.alpha_baseline,
        alpha_load: raw.alpha_load,
        baseline_update_threshold_ms: raw.baseline_update_threshold_ms,
    })
}

/// Resolve a `${ENV_NAME}` reference from the environment. A missing
/// variable is a terminal config error.
fn resolve_env_ref(value: Option<String>) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else { return Ok(None) };
    if let Some(inner) = value
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
    {
        let resolved = std::env::var(inner).map_err(|_| ConfigError::MissingEnvVar(inner.to_string()))?;
        Ok(Some(resolved))
    } else {
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml(extra_download: &str, extra_thresholds: &str) -> String {
        format!(
            r#"
wan_name: wan0
primary: true
router:
  transport: rest
  host: 192.0.2.1
  user: admin
  password: hunter2
queues:
  download: wan0-down
  upload: wan0-up
continuous_monitoring:
  enabled: true
  baseline_rtt_initial: 25.0
  ping_hosts: ["9.9.9.9", "1.1.1.1", "8.8.8.8"]
  use_median_of_three: true
  download:
    floor_green_mbps: 550
    floor_yellow_mbps: 400
    floor_red_mbps: 200
    ceiling_mbps: 940
    step_up_mbps: 10
    factor_down: 0.85
    {extra_download}
  upload:
    floor_green_mbps: 50
    floor_yellow_mbps: 40
    floor_red_mbps: 20
    ceiling_mbps: 100
    step_up_mbps: 2
    factor_down: 0.85
  thresholds:
    target_bloat_ms: 15
    warn_bloat_ms: 45
    alpha_baseline: 0.02
    alpha_load: 0.20
    {extra_thresholds}
state:
  dir: /var/lib/wanctl
"#
        )
    }

    #[test]
    fn three_state_config_parses() {
        let yaml = minimal_yaml("", "");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        let cfg = ValidatedWanConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.fsm_kind, FsmKind::ThreeState);
        assert_eq!(cfg.wan_name, "wan0");
        assert!(cfg.primary);
    }

    #[test]
    fn four_state_config_parses() {
        let yaml = minimal_yaml(
            "floor_soft_red_mbps: 275",
            "hard_red_bloat_ms: 80",
        );
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        let cfg = ValidatedWanConfig::from_raw(raw).unwrap();
        assert!(cfg.fsm_kind.is_four_state());
        assert_eq!(cfg.fsm_kind.hard_red_bloat_ms(), Some(80.0));
    }

    #[test]
    fn soft_red_without_hard_red_is_error() {
        let yaml = minimal_yaml("floor_soft_red_mbps: 275", "");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(ValidatedWanConfig::from_raw(raw).is_err());
    }

    #[test]
    fn floor_ordering_violation_rejected() {
        let yaml = minimal_yaml("", "").replace("floor_red_mbps: 200", "floor_red_mbps: 999");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            ValidatedWanConfig::from_raw(raw),
            Err(ConfigError::FloorOrdering { .. })
        ));
    }

    #[test]
    fn alpha_ordering_violation_rejected() {
        let yaml = minimal_yaml("", "")
            .replace("alpha_baseline: 0.02", "alpha_baseline: 0.5")
            .replace("alpha_load: 0.20", "alpha_load: 0.1");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            ValidatedWanConfig::from_raw(raw),
            Err(ConfigError::AlphaOutOfRange(_))
        ));
    }

    #[test]
    fn factor_down_out_of_range_rejected() {
        let yaml = minimal_yaml("", "").replace("factor_down: 0.85", "factor_down: 1.2");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            ValidatedWanConfig::from_raw(raw),
            Err(ConfigError::FactorDownOutOfRange(_))
        ));
    }

    #[test]
    fn missing_env_var_is_error() {
        let yaml = minimal_yaml("", "").replace(
            "password: hunter2",
            "password: \"${WANCTL_TEST_DOES_NOT_EXIST_XYZ}\"",
        );
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            ValidatedWanConfig::from_raw(raw),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn env_var_resolved_when_present() {
        std::env::set_var("WANCTL_TEST_PW", "s3cret");
        let yaml = minimal_yaml("", "")
            .replace("password: hunter2", "password: \"${WANCTL_TEST_PW}\"");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        let cfg = ValidatedWanConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.router.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn default_ports_applied() {
        let yaml = minimal_yaml("", "");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        let cfg = ValidatedWanConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.router.port, 443);
    }

    #[test]
    fn ssh_default_port_is_22() {
        let yaml = minimal_yaml("", "").replace("transport: rest", "transport: ssh");
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        let cfg = ValidatedWanConfig::from_raw(raw).unwrap();
        assert_eq!(cfg.router.port, 22);
    }

    #[test]
    fn empty_ping_hosts_rejected() {
        let yaml = minimal_yaml("", "").replace(
            r#"ping_hosts: ["9.9.9.9", "1.1.1.1", "8.8.8.8"]"#,
            "ping_hosts: []",
        );
        let raw: WanFile = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(
            ValidatedWanConfig::from_raw(raw),
            Err(ConfigError::MissingKey(_))
        ));
    }

    #[test]
    fn unknown_top_level_key_does_not_fail_parse() {
        let yaml = minimal_yaml("", "").replace(
            "wan_name: wan0",
            "wan_name: wan0\nsome_future_field: 42",
        );
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        warn_unknown_keys("test.yaml", &value);
        let raw: WanFile = serde_yaml::from_value(value).unwrap();
        assert!(ValidatedWanConfig::from_raw(raw).is_ok());
    }
}
