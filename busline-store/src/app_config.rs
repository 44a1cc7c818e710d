use busline_catalog::{FareConfig, FarePolicy};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_LOG_FILTER: &str = "busline_api=info,busline_order=info";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub fares: FaresConfig,
    pub fleet: FleetConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FaresConfig {
    pub policy: String,
    pub flat_fare: u64,
    pub segment_fare: u64,
    pub default_seat_fare: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FleetConfig {
    pub default_total_seats: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub filter: String,
}

impl FaresConfig {
    pub fn fare_config(&self) -> Result<FareConfig, config::ConfigError> {
        let policy = match self.policy.trim().to_ascii_lowercase().as_str() {
            "stop_difference" => FarePolicy::StopDifference,
            "flat_per_seat" => FarePolicy::FlatPerSeat(self.flat_fare),
            "per_segment" => FarePolicy::PerSegment(self.segment_fare),
            other => {
                return Err(config::ConfigError::Message(format!(
                    "unknown fare policy: {}",
                    other
                )))
            }
        };
        Ok(FareConfig {
            policy,
            default_seat_fare: self.default_seat_fare,
        })
    }
}

impl SessionConfig {
    /// Configured path, else `<config dir>/busline/session.json`
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::config_dir()
            .map(|dir| dir.join("busline").join("session.json"))
            .unwrap_or_else(|| PathBuf::from(".busline-session.json"))
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    /// Layer built-in defaults, `default`, `{RUN_MODE}` and `local` files
    /// under `dir`, then `BUSLINE__*` environment variables.
    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("fares.policy", "stop_difference")?
            .set_default("fares.flat_fare", 300)?
            .set_default("fares.segment_fare", 100)?
            .set_default("fares.default_seat_fare", 300)?
            .set_default("fleet.default_total_seats", 40)?
            .set_default("log.filter", DEFAULT_LOG_FILTER)?
            .add_source(config::File::with_name(&file("default")).required(false))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            .add_source(config::Environment::with_prefix("BUSLINE").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.fares.fare_config()?;
        tracing::debug!(base_url = %config.api.base_url, "Loaded configuration");
        Ok(config)
    }

    pub fn fare_config(&self) -> Result<FareConfig, config::ConfigError> {
        self.fares.fare_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert_eq!(config.fleet.default_total_seats, 40);
        assert_eq!(config.fares.default_seat_fare, 300);
        assert_eq!(config.fare_config().unwrap(), FareConfig::default());
        assert!(config.session.path.is_none());
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
            [api]
            base_url = "https://buses.example.com/api"

            [fares]
            policy = "flat_per_seat"
            flat_fare = 450

            [session]
            path = "/tmp/busline-test/session.json"
            "#,
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.api.base_url, "https://buses.example.com/api");
        assert_eq!(
            config.fare_config().unwrap().policy,
            FarePolicy::FlatPerSeat(450)
        );
        assert_eq!(
            config.session.resolved_path(),
            PathBuf::from("/tmp/busline-test/session.json")
        );
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("local.toml"),
            "[fares]\npolicy = \"surge\"\n",
        )
        .unwrap();

        assert!(Config::load_from(dir.path()).is_err());
    }

    #[test]
    fn test_default_session_path() {
        let path = SessionConfig::default().resolved_path();
        assert!(path.ends_with("session.json"));
    }
}
