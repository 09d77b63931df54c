use clap::Parser;
use lib_common::processor::TransformOptions;
use lib_common::sources::{OpenF1Query, JOLPICA_BASE, OPENF1_BASE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "server_race.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[command(about = "Live race telemetry WebSocket server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[arg(long, env = "RACE_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    #[arg(long, env = "RACE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "RACE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "RACE_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[arg(long, env = "RACE_TICK_INTERVAL_SECS", help = "Seconds between broadcast ticks.")]
    pub tick_interval_secs: Option<u64>,

    #[arg(long, env = "RACE_REQUEST_TIMEOUT_SECS", help = "Timeout in seconds for each upstream request.")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "RACE_CACHE_TTL_SECS", help = "Lifetime in seconds of cached standings lookups.")]
    pub cache_ttl_secs: Option<u64>,

    #[arg(long, env = "RACE_OPENF1_BASE_URL", help = "Base URL of the OpenF1 API.")]
    pub openf1_base_url: Option<String>,

    #[arg(long, env = "RACE_JOLPICA_BASE_URL", help = "Base URL of the Jolpica (Ergast) API.")]
    pub jolpica_base_url: Option<String>,

    #[arg(long, env = "RACE_SEASON", help = "Season used by the standings source (a year or 'current').")]
    pub season: Option<String>,

    #[arg(long, env = "RACE_MEETING_NAME", help = "OpenF1 meeting to follow.")]
    pub meeting_name: Option<String>,

    #[arg(long, env = "RACE_MEETING_YEAR", help = "Year of the OpenF1 meeting.")]
    pub meeting_year: Option<i32>,

    #[arg(long, env = "RACE_SESSION_NAME", help = "OpenF1 session name (Race, Qualifying, ...).")]
    pub session_name: Option<String>,

    #[arg(long, env = "RACE_SIMULATION_ONLY", help = "Skip the live APIs and broadcast the simulated roster.")]
    pub simulation_only: Option<bool>,

    #[arg(long, env = "RACE_SESSION_OVERRIDE", help = "Pin status/lap/total laps to RACE, 42, 50.")]
    pub session_override: Option<bool>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            tick_interval_secs: other.tick_interval_secs.or(self.tick_interval_secs),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            cache_ttl_secs: other.cache_ttl_secs.or(self.cache_ttl_secs),
            openf1_base_url: other.openf1_base_url.or(self.openf1_base_url),
            jolpica_base_url: other.jolpica_base_url.or(self.jolpica_base_url),
            season: other.season.or(self.season),
            meeting_name: other.meeting_name.or(self.meeting_name),
            meeting_year: other.meeting_year.or(self.meeting_year),
            session_name: other.session_name.or(self.session_name),
            simulation_only: other.simulation_only.or(self.simulation_only),
            session_override: other.session_override.or(self.session_override),
        }
    }

    pub fn defaults() -> Config {
        Config {
            port: Some(8000),
            config_path: None,
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            tick_interval_secs: Some(5),
            request_timeout_secs: Some(10),
            cache_ttl_secs: Some(60),
            openf1_base_url: Some(OPENF1_BASE.to_string()),
            jolpica_base_url: Some(JOLPICA_BASE.to_string()),
            season: Some("current".to_string()),
            meeting_name: Some("Las Vegas".to_string()),
            meeting_year: Some(2024),
            session_name: Some("Race".to_string()),
            simulation_only: Some(false),
            session_override: Some(true),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8000)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.unwrap_or(5).max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(10).max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(60))
    }

    pub fn openf1_base_url(&self) -> &str {
        self.openf1_base_url.as_deref().unwrap_or(OPENF1_BASE)
    }

    pub fn jolpica_base_url(&self) -> &str {
        self.jolpica_base_url.as_deref().unwrap_or(JOLPICA_BASE)
    }

    pub fn season(&self) -> &str {
        self.season.as_deref().unwrap_or("current")
    }

    pub fn simulation_only(&self) -> bool {
        self.simulation_only.unwrap_or(false)
    }

    /// Session OpenF1 is asked for. Round and lap count stay at the Las Vegas values.
    pub fn openf1_query(&self) -> OpenF1Query {
        let base = OpenF1Query::default();
        let meeting_name = self.meeting_name.clone().unwrap_or(base.meeting_name.clone());
        let year = self.meeting_year.unwrap_or(base.year);
        OpenF1Query {
            race_label: format!("{} Grand Prix", meeting_name),
            season: year.to_string(),
            meeting_name,
            year,
            session_name: self.session_name.clone().unwrap_or(base.session_name.clone()),
            ..base
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        if self.session_override.unwrap_or(true) {
            TransformOptions::default()
        } else {
            TransformOptions::from_record()
        }
    }
}

/// Reads a JSON config file. A missing or broken file is logged and ignored.
fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        log::info!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            path.display()
        );
        return None;
    }

    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                log::warn!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    path.display(),
                    e
                );
                None
            }
        },
        Err(e) => {
            log::warn!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                path.display(),
                e
            );
            None
        }
    }
}

/// Defaults, then the config file, then environment variables and CLI arguments.
pub fn resolve(cli_args: Config) -> Config {
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }
    current_config.merge(cli_args)
}

pub fn load_config() -> Config {
    resolve(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_common::processor::SessionOverride;
    use std::io::Write;

    fn cli(args: &[&str]) -> Config {
        let mut argv = vec!["server_race"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_overrides_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 9100, "season": "2023", "tickIntervalSecs": 2, "simulationOnly": true}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = resolve(cli(&["--config-path", &path, "--port", "9200"]));

        assert_eq!(config.port(), 9200);
        assert_eq!(config.season(), "2023");
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert!(config.simulation_only());
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "port = 9100").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = resolve(cli(&["--config-path", &path]));
        assert_eq!(config.port(), 8000);
        assert_eq!(config.openf1_base_url(), OPENF1_BASE);
        assert_eq!(config.jolpica_base_url(), JOLPICA_BASE);
    }

    #[test]
    fn bool_flags_take_values() {
        let config = cli(&["--session-override", "false", "--simulation-only", "true"]);
        assert_eq!(config.session_override, Some(false));
        assert!(config.simulation_only());
        assert_eq!(config.transform_options().session_override, None);

        let pinned = Config::defaults().transform_options();
        assert_eq!(pinned.session_override, Some(SessionOverride::default()));
    }

    #[test]
    fn openf1_query_follows_meeting() {
        let mut config = Config::defaults();
        config.meeting_name = Some("Monaco".to_string());
        config.meeting_year = Some(2023);
        config.session_name = Some("Qualifying".to_string());

        let query = config.openf1_query();
        assert_eq!(query.meeting_name, "Monaco");
        assert_eq!(query.race_label, "Monaco Grand Prix");
        assert_eq!(query.season, "2023");
        assert_eq!(query.session_name, "Qualifying");
        assert_eq!(query.total_laps, OpenF1Query::default().total_laps);
    }
}
