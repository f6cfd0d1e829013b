//! Device configuration – reads/writes `~/.robio/config.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use robio_hal::{DEFAULT_DEADBAND, EncoderKind, shaper};
use robio_types::{Calibration, RobioError, RunMode};
use serde::{Deserialize, Serialize};

/// Persisted configuration stored in `~/.robio/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-loop period in milliseconds.
    #[serde(default = "default_period_ms")]
    pub control_period_ms: u64,

    /// Cycles to run before exiting; `0` runs until Ctrl-C.
    #[serde(default)]
    pub cycles: u64,

    /// Run mode reported by the simulated driver station.
    #[serde(default = "default_mode")]
    pub mode: RunMode,

    #[serde(default)]
    pub joysticks: Vec<JoystickConfig>,

    #[serde(default)]
    pub gamepads: Vec<GamepadConfig>,

    #[serde(default)]
    pub encoders: Vec<EncoderConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoystickConfig {
    pub name: String,
    pub port: u8,
    #[serde(default = "default_deadband")]
    pub deadband: f64,
    #[serde(default = "default_period_ms")]
    pub sampling_period_ms: u64,
    #[serde(default)]
    pub y_inverted: bool,
    /// Forward button events to the log tracer.
    #[serde(default)]
    pub trace_events: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamepadConfig {
    pub name: String,
    pub port: u8,
    #[serde(default = "default_deadband")]
    pub deadband: f64,
    #[serde(default = "default_period_ms")]
    pub sampling_period_ms: u64,
    #[serde(default)]
    pub left_y_inverted: bool,
    #[serde(default)]
    pub right_y_inverted: bool,
    #[serde(default)]
    pub trace_events: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub name: String,
    pub kind: EncoderKind,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl EncoderConfig {
    pub fn calibration(&self) -> Calibration {
        Calibration::new(self.inverted, self.scale, self.offset)
    }
}

impl JoystickConfig {
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }
}

impl GamepadConfig {
    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }
}

fn default_period_ms() -> u64 {
    20
}
fn default_mode() -> RunMode {
    RunMode::Teleop
}
fn default_deadband() -> f64 {
    DEFAULT_DEADBAND
}
fn default_scale() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_period_ms: default_period_ms(),
            cycles: 0,
            mode: default_mode(),
            joysticks: vec![JoystickConfig {
                name: "driver".to_string(),
                port: 0,
                deadband: default_deadband(),
                sampling_period_ms: default_period_ms(),
                y_inverted: true,
                trace_events: false,
            }],
            gamepads: vec![GamepadConfig {
                name: "operator".to_string(),
                port: 1,
                deadband: default_deadband(),
                sampling_period_ms: default_period_ms(),
                left_y_inverted: false,
                right_y_inverted: false,
                trace_events: true,
            }],
            encoders: vec![
                EncoderConfig {
                    name: "arm".to_string(),
                    kind: EncoderKind::Analog,
                    inverted: false,
                    scale: 360.0,
                    offset: 0.0,
                },
                EncoderConfig {
                    name: "turret".to_string(),
                    kind: EncoderKind::Absolute,
                    inverted: true,
                    scale: 1.0,
                    offset: 90.0,
                },
            ],
        }
    }
}

impl Config {
    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    /// Reject configurations the session cannot be built from.
    ///
    /// # Errors
    ///
    /// [`RobioError::Config`] naming the first offending entry.
    pub fn validate(&self) -> Result<(), RobioError> {
        if self.control_period_ms == 0 {
            return Err(RobioError::Config("control_period_ms must be non-zero".into()));
        }

        let mut names = HashSet::new();
        let mut ports = HashSet::new();
        let hids = self
            .joysticks
            .iter()
            .map(|j| (&j.name, j.port, j.deadband, j.sampling_period_ms))
            .chain(
                self.gamepads
                    .iter()
                    .map(|g| (&g.name, g.port, g.deadband, g.sampling_period_ms)),
            );

        for (name, port, deadband, period_ms) in hids {
            if !names.insert(name.as_str()) {
                return Err(RobioError::Config(format!("duplicate device name `{name}`")));
            }
            if !ports.insert(port) {
                return Err(RobioError::Config(format!("port {port} used by more than one device")));
            }
            shaper::validate_deadband(deadband).map_err(|e| {
                RobioError::Config(format!("device `{name}`: {e}"))
            })?;
            if period_ms == 0 {
                return Err(RobioError::Config(format!(
                    "device `{name}`: sampling_period_ms must be non-zero"
                )));
            }
        }

        for enc in &self.encoders {
            if !names.insert(enc.name.as_str()) {
                return Err(RobioError::Config(format!("duplicate device name `{}`", enc.name)));
            }
        }
        Ok(())
    }
}

/// Return the path to `~/.robio/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".robio").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RobioError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RobioError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| RobioError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| RobioError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `ROBIO_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROBIO_CONTROL_PERIOD_MS` | `control_period_ms` |
/// | `ROBIO_CYCLES` | `cycles` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROBIO_CONTROL_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.control_period_ms = ms;
    }
    if let Ok(v) = std::env::var("ROBIO_CYCLES")
        && let Ok(n) = v.trim().parse::<u64>()
    {
        cfg.cycles = n;
    }
}

/// Save the config to disk, creating `~/.robio/` if necessary.
pub fn save(cfg: &Config) -> Result<(), RobioError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RobioError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RobioError::Config(format!("failed to create {}: {e}", parent.display()))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                RobioError::Config(format!("failed to restrict {}: {e}", parent.display()))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RobioError::Config(format!("failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| RobioError::Config(format!("failed to write {}: {e}", path.display()));

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialises the tests that touch ROBIO_* variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("defaults must validate");
    }

    #[test]
    fn roundtrip_default_config() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_meta = std::fs::metadata(path.parent().unwrap()).unwrap();
        let dir_mode = dir_meta.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn config_path_points_to_robio_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".robio"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn minimal_file_fills_in_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [[joysticks]]
            name = "driver"
            port = 0

            [[encoders]]
            name = "wrist"
            kind = "sensor_inverted"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.control_period_ms, 20);
        assert_eq!(cfg.cycles, 0);
        assert_eq!(cfg.mode, RunMode::Teleop);
        assert_eq!(cfg.joysticks[0].deadband, DEFAULT_DEADBAND);
        assert_eq!(cfg.joysticks[0].sampling_period(), Duration::from_millis(20));
        assert_eq!(cfg.encoders[0].kind, EncoderKind::SensorInverted);
        assert_eq!(cfg.encoders[0].calibration(), Calibration::default());
        assert!(cfg.gamepads.is_empty());
    }

    #[test]
    fn invalid_deadband_is_rejected() {
        let mut cfg = Config::default();
        cfg.joysticks[0].deadband = 1.5;
        assert!(matches!(cfg.validate(), Err(RobioError::Config(msg)) if msg.contains("driver")));
    }

    #[test]
    fn invalid_deadband_in_file_fails_load() {
        let _env = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[gamepads]]\nname = \"operator\"\nport = 1\ndeadband = -0.2\n",
        )
        .unwrap();
        assert!(matches!(load_from(&path), Err(RobioError::Config(_))));
    }

    #[test]
    fn duplicate_names_and_ports_are_rejected() {
        let mut cfg = Config::default();
        cfg.gamepads[0].name = "driver".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.gamepads[0].port = 0;
        assert!(matches!(cfg.validate(), Err(RobioError::Config(msg)) if msg.contains("port 0")));

        let mut cfg = Config::default();
        cfg.encoders[1].name = "arm".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_periods_are_rejected() {
        let mut cfg = Config::default();
        cfg.control_period_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.gamepads[0].sampling_period_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let _env = ENV_LOCK.lock().unwrap();
        // SAFETY: ENV_LOCK serialises every test touching these variables.
        unsafe {
            std::env::set_var("ROBIO_CONTROL_PERIOD_MS", "10");
            std::env::set_var("ROBIO_CYCLES", "not-a-number");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.control_period_ms, 10);
        assert_eq!(cfg.cycles, 0);

        unsafe { std::env::set_var("ROBIO_CYCLES", "250") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.cycles, 250);
        unsafe {
            std::env::remove_var("ROBIO_CONTROL_PERIOD_MS");
            std::env::remove_var("ROBIO_CYCLES");
        }
    }
}
