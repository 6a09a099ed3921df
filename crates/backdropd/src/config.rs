use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use backdrop::{Antialiasing, CanvasConfig, ClockMode, FieldParams, LogicalSize, WindowOptions};
use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{parse_antialias, RunArgs};

pub const ENV_CONFIG_DIR: &str = "BACKDROP_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "backdrop.toml";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Backdrop";
const APPLICATION: &str = "backdrop";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to determine user directories")]
    NoDirectories,
    #[error("failed to read config file at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Where configuration is looked up.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    config_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir: dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or(ConfigError::NoDirectories)?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub window: WindowSection,
    pub animation: AnimationSection,
    pub palette: PaletteSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub antialias: String,
    pub strict: bool,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "backdrop".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            antialias: "auto".to_string(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSetting {
    #[default]
    Stepped,
    Wall,
}

impl From<ClockSetting> for ClockMode {
    fn from(value: ClockSetting) -> Self {
        match value {
            ClockSetting::Stepped => ClockMode::Stepped,
            ClockSetting::Wall => ClockMode::WallClock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationSection {
    pub initial_time: f32,
    pub step: f32,
    pub clock: ClockSetting,
}

impl Default for AnimationSection {
    fn default() -> Self {
        Self {
            initial_time: CanvasConfig::DEFAULT_INITIAL_TIME,
            step: CanvasConfig::DEFAULT_STEP,
            clock: ClockSetting::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteSection {
    pub time_scale: f32,
    pub line_width: f32,
    pub harmonics: u32,
    pub channel_offset: f32,
    pub harmonic_offset: f32,
    pub ring_scale: f32,
    pub band_period: f32,
    pub channel_scale: [f32; 3],
    pub channel_bias: [f32; 3],
}

impl Default for PaletteSection {
    fn default() -> Self {
        Self::from(&FieldParams::default())
    }
}

impl From<&FieldParams> for PaletteSection {
    fn from(params: &FieldParams) -> Self {
        Self {
            time_scale: params.time_scale,
            line_width: params.line_width,
            harmonics: params.harmonics,
            channel_offset: params.channel_offset,
            harmonic_offset: params.harmonic_offset,
            ring_scale: params.ring_scale,
            band_period: params.band_period,
            channel_scale: params.channel_scale,
            channel_bias: params.channel_bias,
        }
    }
}

impl PaletteSection {
    pub fn field_params(&self) -> Result<FieldParams, ConfigError> {
        let params = FieldParams {
            time_scale: self.time_scale,
            line_width: self.line_width,
            harmonics: self.harmonics,
            channel_offset: self.channel_offset,
            harmonic_offset: self.harmonic_offset,
            ring_scale: self.ring_scale,
            band_period: self.band_period,
            channel_scale: self.channel_scale,
            channel_bias: self.channel_bias,
        };
        params.validate().map_err(|err| ConfigError::Invalid {
            field: "palette",
            message: err.to_string(),
        })?;
        Ok(params)
    }
}

impl FileConfig {
    /// Loads `explicit` if given (it must exist), otherwise the default file if present.
    pub fn load(paths: &ConfigPaths, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = paths.config_file();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    debug!(path = %path.display(), "no config file; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlays command-line flags onto the file values.
    pub fn apply_run_args(&mut self, args: &RunArgs) {
        if let Some((width, height)) = args.size {
            self.window.width = width;
            self.window.height = height;
        }
        if args.fullscreen {
            self.window.fullscreen = true;
        }
        if let Some(title) = &args.title {
            self.window.title = title.clone();
        }
        if let Some(antialias) = args.antialias {
            self.window.antialias = match antialias {
                Antialiasing::Auto => "auto".to_string(),
                Antialiasing::Off => "off".to_string(),
                Antialiasing::Samples(samples) => samples.to_string(),
            };
        }
        if let Some(clock) = args.clock {
            self.animation.clock = match clock {
                ClockMode::Stepped => ClockSetting::Stepped,
                ClockMode::WallClock => ClockSetting::Wall,
            };
        }
        if let Some(step) = args.step {
            self.animation.step = step;
        }
        if let Some(initial_time) = args.initial_time {
            self.animation.initial_time = initial_time;
        }
        if args.strict {
            self.window.strict = true;
        }
    }

    pub fn canvas_config(&self) -> Result<CanvasConfig, ConfigError> {
        let animation = &self.animation;
        if !animation.initial_time.is_finite() {
            return Err(ConfigError::Invalid {
                field: "animation.initial_time",
                message: format!("must be finite (got {})", animation.initial_time),
            });
        }
        if !(animation.step.is_finite() && animation.step > 0.0) {
            return Err(ConfigError::Invalid {
                field: "animation.step",
                message: format!("must be a positive number (got {})", animation.step),
            });
        }
        Ok(CanvasConfig {
            initial_time: animation.initial_time,
            step: animation.step,
            clock: animation.clock.into(),
            field: self.palette.field_params()?,
        })
    }

    pub fn window_options(&self) -> Result<WindowOptions, ConfigError> {
        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid {
                field: "window.width/window.height",
                message: format!("must be non-zero (got {}x{})", window.width, window.height),
            });
        }
        let antialiasing = parse_antialias(&window.antialias).map_err(|message| {
            ConfigError::Invalid {
                field: "window.antialias",
                message,
            }
        })?;
        Ok(WindowOptions {
            title: window.title.clone(),
            size: LogicalSize::new(f64::from(window.width), f64::from(window.height)),
            fullscreen: window.fullscreen,
            canvas: self.canvas_config()?,
            antialiasing,
            strict: window.strict,
        })
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_override_sets_config_dir() {
        let _lock = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let _guard = EnvGuard::set(ENV_CONFIG_DIR, root.path());

        let paths = ConfigPaths::discover().unwrap();
        assert_eq!(paths.config_dir(), root.path());
        assert_eq!(paths.config_file(), root.path().join("backdrop.toml"));
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        let root = TempDir::new().unwrap();
        let paths = ConfigPaths {
            config_dir: root.path().to_path_buf(),
        };
        let config = FileConfig::load(&paths, None).unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.canvas_config().unwrap(), CanvasConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let root = TempDir::new().unwrap();
        let paths = ConfigPaths {
            config_dir: root.path().to_path_buf(),
        };
        let err = FileConfig::load(&paths, Some(&root.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("backdrop.toml");
        fs::write(
            &path,
            "[animation]\nstep = 0.1\nclock = \"wall\"\n\n[palette]\nharmonics = 7\n",
        )
        .unwrap();

        let config = FileConfig::load_file(&path).unwrap();
        let canvas = config.canvas_config().unwrap();
        assert_eq!(canvas.step, 0.1);
        assert_eq!(canvas.initial_time, 1.0);
        assert_eq!(canvas.clock, ClockMode::WallClock);
        assert_eq!(canvas.field.harmonics, 7);
        assert_eq!(canvas.field.line_width, FieldParams::default().line_width);
        assert_eq!(config.window, WindowSection::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("backdrop.toml");
        fs::write(&path, "[window]\nwidht = 10\n").unwrap();
        let err = FileConfig::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn invalid_values_name_the_field() {
        let mut config = FileConfig::default();
        config.animation.step = -1.0;
        let err = config.canvas_config().unwrap_err();
        assert!(err.to_string().contains("animation.step"));

        let mut config = FileConfig::default();
        config.palette.harmonics = 0;
        let err = config.canvas_config().unwrap_err();
        assert!(err.to_string().contains("palette"));

        let mut config = FileConfig::default();
        config.window.antialias = "3".to_string();
        assert!(config.window_options().is_err());
    }

    #[test]
    fn cli_flags_override_file_values() {
        let mut config = FileConfig::default();
        config.window.width = 640;
        let args = RunArgs {
            size: Some((1920, 1080)),
            antialias: Some(Antialiasing::Samples(4)),
            clock: Some(ClockMode::WallClock),
            step: Some(0.2),
            strict: true,
            ..RunArgs::default()
        };
        config.apply_run_args(&args);

        let options = config.window_options().unwrap();
        assert_eq!(options.size, LogicalSize::new(1920.0, 1080.0));
        assert_eq!(options.antialiasing, Antialiasing::Samples(4));
        assert_eq!(options.canvas.clock, ClockMode::WallClock);
        assert_eq!(options.canvas.step, 0.2);
        assert!(options.strict);
        assert_eq!(options.title, "backdrop");
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&FileConfig::default()).unwrap();
        assert!(text.contains("[palette]"));
        let parsed: FileConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, FileConfig::default());
    }
}
