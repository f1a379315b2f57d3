use serde::Deserialize;
use skillhub_logging::LogFormat;
use skillhub_registry::{LoaderConfig, ScanConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
# Token budget for `skillhub load` when --budget is not given
default_budget = 4000

[corpus]
directories = ["~/.skillhub/plugins"]
scan_timeout_secs = 30

[loader]
tokens_per_summary_line = 12
chars_per_token = 4
include_enhances = false
min_match_score = 0.0
tier3_headroom_factor = 2

[logging]
level = "warn"  # trace, debug, info, warn, error
format = "pretty"  # or "json"
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_budget")]
    pub default_budget: i64,
    #[serde(default)]
    pub corpus: ScanConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_budget() -> i64 {
    4_000
}

impl Config {
    /// Get the global config path: ~/.skillhub/skillhub.toml
    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".skillhub").join("skillhub.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<Option<PathBuf>> {
        let Some(config_path) = Self::global_config_path() else {
            eprintln!("No home directory found, skipping global config");
            return Ok(None);
        };

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
        }

        Ok(Some(config_path))
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.skillhub/skillhub.toml (auto-created if missing)
    /// 2. Local override: ./skillhub.toml (optional)
    /// 3. Explicit `--config` file
    /// 4. Environment variables with SKILLHUB__ prefix (.env included)
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(global) = Self::ensure_global_config()? {
            builder = builder.add_source(config::File::from(global));
        }
        builder = builder.add_source(config::File::with_name("skillhub").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        builder = builder.add_source(config::Environment::with_prefix("SKILLHUB").separator("__"));

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.expand_directories();
        Ok(config)
    }

    fn expand_directories(&mut self) {
        let home = dirs::home_dir();
        for dir in &mut self.corpus.directories {
            *dir = expand_tilde(dir, home.as_deref());
        }
    }
}

/// Replace a leading `~` with the home directory
fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
