//! Run configuration – reads/writes `~/.refills/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use refills_runtime::ScanConfig;
use refills_types::RefillsError;
use serde::{Deserialize, Serialize};

/// Persisted operator configuration stored in `~/.refills/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// rosbridge WebSocket endpoint in front of the knowledge store.
    #[serde(default = "default_rosbridge_url")]
    pub rosbridge_url: String,

    /// Count products on every non-hanging floor after it is scanned.
    #[serde(default = "default_counting_enabled")]
    pub counting_enabled: bool,

    /// Lateral extent of one shelf floor in metres.
    #[serde(default = "default_floor_width")]
    pub floor_width: f64,

    /// JSON file mapping barcodes to product meshes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_mesh_path: Option<PathBuf>,

    /// Directory the belief state and action graph are written to.  The path
    /// is interpreted by the knowledge store host.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound on every knowledge store round trip.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Drive the in-process simulated base, arm and perception.  The binary
    /// ships no other drivers, so a run is refused while this is off.
    #[serde(default)]
    pub simulate_robot: bool,
}

fn default_rosbridge_url() -> String {
    "ws://localhost:9090".to_string()
}
fn default_counting_enabled() -> bool {
    true
}
fn default_floor_width() -> f64 {
    1.0
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/refills")
}
fn default_query_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rosbridge_url: default_rosbridge_url(),
            counting_enabled: default_counting_enabled(),
            floor_width: default_floor_width(),
            barcode_mesh_path: None,
            data_dir: default_data_dir(),
            query_timeout_secs: default_query_timeout_secs(),
            simulate_robot: false,
        }
    }
}

impl Config {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            counting_enabled: self.counting_enabled,
            floor_width: self.floor_width,
        }
    }
}

/// Return the path to `~/.refills/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".refills").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RefillsError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RefillsError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RefillsError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| RefillsError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `REFILLS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `REFILLS_ROSBRIDGE_URL` | `rosbridge_url` |
/// | `REFILLS_COUNTING` | `counting_enabled` (`true` / `false`) |
/// | `REFILLS_FLOOR_WIDTH` | `floor_width` |
/// | `REFILLS_BARCODE_MESHES` | `barcode_mesh_path` |
/// | `REFILLS_DATA_DIR` | `data_dir` |
/// | `REFILLS_QUERY_TIMEOUT_SECS` | `query_timeout_secs` |
/// | `REFILLS_SIMULATE_ROBOT` | `simulate_robot` (`true` / `false`) |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("REFILLS_ROSBRIDGE_URL") {
        cfg.rosbridge_url = v;
    }
    if let Ok(v) = std::env::var("REFILLS_COUNTING")
        && let Ok(enabled) = v.parse::<bool>()
    {
        cfg.counting_enabled = enabled;
    }
    if let Ok(v) = std::env::var("REFILLS_FLOOR_WIDTH")
        && let Ok(width) = v.parse::<f64>()
    {
        cfg.floor_width = width;
    }
    if let Ok(v) = std::env::var("REFILLS_BARCODE_MESHES") {
        cfg.barcode_mesh_path = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("REFILLS_DATA_DIR") {
        cfg.data_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("REFILLS_QUERY_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.query_timeout_secs = secs;
    }
    if let Ok(v) = std::env::var("REFILLS_SIMULATE_ROBOT")
        && let Ok(simulate) = v.parse::<bool>()
    {
        cfg.simulate_robot = simulate;
    }
}

/// Save the config to disk, creating `~/.refills/` if necessary.
pub fn save(cfg: &Config) -> Result<(), RefillsError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RefillsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RefillsError::Config(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RefillsError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| RefillsError::Config(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.rosbridge_url, "ws://localhost:9090");
        assert!(loaded.counting_enabled);
        assert_eq!(loaded.floor_width, 1.0);
        assert_eq!(loaded.barcode_mesh_path, None);
        assert_eq!(loaded.query_timeout_secs, 10);
        assert!(!loaded.simulate_robot);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "counting_enabled = false\nbarcode_mesh_path = \"/opt/refills/meshes.json\"\n",
        )
        .expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert!(!loaded.counting_enabled);
        assert_eq!(
            loaded.barcode_mesh_path,
            Some(PathBuf::from("/opt/refills/meshes.json"))
        );
        assert_eq!(loaded.data_dir, default_data_dir());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "floor_width = \"wide\"").expect("write");
        assert!(matches!(load_from(&path), Err(RefillsError::Config(_))));
    }

    #[test]
    fn config_path_points_to_refills_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.refills/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn scan_config_carries_run_switches() {
        let cfg = Config {
            counting_enabled: false,
            floor_width: 0.75,
            ..Config::default()
        };
        assert_eq!(
            cfg.scan_config(),
            ScanConfig {
                counting_enabled: false,
                floor_width: 0.75
            }
        );
    }

    #[test]
    fn apply_env_overrides_changes_rosbridge_url() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("REFILLS_ROSBRIDGE_URL", "ws://robot:9090") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.rosbridge_url, "ws://robot:9090");
        unsafe { std::env::remove_var("REFILLS_ROSBRIDGE_URL") };
    }

    #[test]
    fn apply_env_overrides_changes_counting() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("REFILLS_COUNTING", "false") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(!cfg.counting_enabled);
        unsafe { std::env::remove_var("REFILLS_COUNTING") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_width() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("REFILLS_FLOOR_WIDTH", "one metre") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.floor_width, 1.0);
        unsafe { std::env::remove_var("REFILLS_FLOOR_WIDTH") };
    }

    #[test]
    fn apply_env_overrides_enables_simulation() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("REFILLS_SIMULATE_ROBOT", "true") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!(cfg.simulate_robot);
        unsafe { std::env::remove_var("REFILLS_SIMULATE_ROBOT") };
    }

    #[test]
    fn apply_env_overrides_changes_timeout() {
        // SAFETY: no other test touches this variable.
        unsafe { std::env::set_var("REFILLS_QUERY_TIMEOUT_SECS", "30") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.query_timeout_secs, 30);
        unsafe { std::env::remove_var("REFILLS_QUERY_TIMEOUT_SECS") };
    }
}
