//! Configuration vault – reads/writes `~/.ergoreach/config.toml`.

use ergoreach_runtime::SessionConfig;
use ergoreach_types::JointSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted operator configuration.
///
/// ```toml
/// recording_dir = "recordings"
///
/// [session]
/// joint_source = "skeletal"
/// controller_angle_offset_deg = 30.0
/// reach_radius_scale = 1.0
/// default_preset = 0
/// extrapolation = "clamp"
/// left_idle_prompt = "Press X to calibrate"
/// right_idle_prompt = "Press A to calibrate"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that relative `/load` paths are resolved against.
    #[serde(default = "default_recording_dir")]
    pub recording_dir: String,

    #[serde(default)]
    pub session: SessionConfig,
}

fn default_recording_dir() -> String {
    ".".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recording_dir: default_recording_dir(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Resolve a recording path against `recording_dir`.
    pub fn resolve_recording(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            Path::new(&self.recording_dir).join(p)
        }
    }
}

/// Return the path to `~/.ergoreach/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".ergoreach").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Load the config, falling back to defaults (with env overrides) when the
/// file is missing or unreadable.
pub fn load_or_default() -> (Config, Option<String>) {
    match load() {
        Ok(Some(cfg)) => (cfg, None),
        Ok(None) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            (cfg, None)
        }
        Err(e) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            (cfg, Some(e))
        }
    }
}

/// Apply `ERGOREACH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ERGOREACH_JOINT_SOURCE` | `session.joint_source` |
/// | `ERGOREACH_CONTROLLER_OFFSET` | `session.controller_angle_offset_deg` |
/// | `ERGOREACH_REACH_SCALE` | `session.reach_radius_scale` |
/// | `ERGOREACH_PRESET` | `session.default_preset` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ERGOREACH_JOINT_SOURCE")
        && let Ok(source) = v.parse::<JointSource>()
    {
        cfg.session.joint_source = source;
    }
    if let Ok(v) = std::env::var("ERGOREACH_CONTROLLER_OFFSET")
        && let Ok(deg) = v.trim().parse::<f32>()
        && deg.is_finite()
    {
        cfg.session.controller_angle_offset_deg = deg;
    }
    if let Ok(v) = std::env::var("ERGOREACH_REACH_SCALE")
        && let Ok(scale) = v.trim().parse::<f32>()
        && scale > 0.0
        && scale.is_finite()
    {
        cfg.session.reach_radius_scale = scale;
    }
    if let Ok(v) = std::env::var("ERGOREACH_PRESET")
        && let Ok(preset) = v.trim().parse::<usize>()
    {
        cfg.session.default_preset = preset;
    }
}

/// Save the config to disk, creating `~/.ergoreach/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
