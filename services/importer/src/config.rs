//! Importer configuration from flags and environment variables.
//!
//! Every setting can be given as a flag or through the environment (a `.env`
//! file is loaded first). Names and defaults match the container image.

use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dhis2_client::{Dhis2Config, ImportStrategy};
use era5_common::time::parse_iso_date;
use era5_common::{DateRange, Unit};
use grid_processor::Aggregation;
use thiserror::Error;

use crate::cron::CronSchedule;

#[derive(Parser, Debug)]
#[command(name = "era5-importer")]
#[command(about = "Import ERA5-Land daily aggregates into DHIS2", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// CDS API root
    #[arg(long, env = "CDSAPI_URL", default_value = "https://cds.climate.copernicus.eu/api")]
    pub cdsapi_url: String,

    /// CDS personal access token
    #[arg(long, env = "CDSAPI_KEY", hide_env_values = true)]
    pub cdsapi_key: Option<String>,

    /// DHIS2 instance root, e.g. https://dhis2.example.org
    #[arg(long, env = "DHIS2_BASE_URL")]
    pub dhis2_base_url: Option<String>,

    #[arg(long, env = "DHIS2_USERNAME")]
    pub dhis2_username: Option<String>,

    #[arg(long, env = "DHIS2_PASSWORD", hide_env_values = true)]
    pub dhis2_password: Option<String>,

    /// Data element the values are imported into
    #[arg(long, env = "DHIS2_DATA_ELEMENT_ID")]
    pub data_element_id: Option<String>,

    /// CDS variable name
    #[arg(long, env = "DHIS2_VARIABLE", default_value = "total_precipitation")]
    pub variable: String,

    /// NetCDF variable holding the values (depends on `variable`)
    #[arg(long, env = "DHIS2_VALUE_COL", default_value = "tp")]
    pub value_col: String,

    /// De-accumulate values before aggregating (precipitation, runoff)
    #[arg(long, env = "DHIS2_IS_CUMULATIVE", default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    pub is_cumulative: bool,

    #[arg(long, env = "DHIS2_FROM_UNITS", default_value = "m")]
    pub from_units: String,

    #[arg(long, env = "DHIS2_TO_UNITS", default_value = "mm")]
    pub to_units: String,

    /// Hourly to daily reduction: sum, mean, min or max
    #[arg(long, env = "DHIS2_TEMPORAL_AGGREGATION", default_value = "sum")]
    pub temporal_aggregation: String,

    /// Grid cells to org unit reduction: sum, mean, min or max
    #[arg(long, env = "DHIS2_SPATIAL_AGGREGATION", default_value = "mean")]
    pub spatial_aggregation: String,

    /// First day to import (YYYY-MM-DD)
    #[arg(long, env = "DHIS2_START_DATE", default_value = "2025-01-01")]
    pub start_date: String,

    /// Last day to import (YYYY-MM-DD), defaults to today
    #[arg(long, env = "DHIS2_END_DATE")]
    pub end_date: Option<String>,

    /// Directory for downloaded NetCDF files
    #[arg(long, env = "DHIS2_DOWNLOAD_FOLDER", default_value = "./target/data")]
    pub download_folder: PathBuf,

    /// File name prefix for downloaded NetCDF files
    #[arg(long, env = "DHIS2_DOWNLOAD_PREFIX", default_value = "era5_hourly")]
    pub download_prefix: String,

    /// Hours added to UTC timestamps before grouping into days
    #[arg(long, env = "DHIS2_TIMEZONE_OFFSET", default_value = "0", allow_hyphen_values = true)]
    pub timezone_offset: i32,

    /// Org-unit hierarchy level to aggregate to
    #[arg(long, env = "DHIS2_ORG_UNIT_LEVEL", default_value = "2")]
    pub org_unit_level: u32,

    /// DHIS2 importStrategy: CREATE_AND_UPDATE, CREATE or UPDATE
    #[arg(long, env = "DHIS2_IMPORT_STRATEGY", default_value = "CREATE_AND_UPDATE")]
    pub import_strategy: String,

    /// Compute everything but skip the import
    #[arg(long, env = "DHIS2_DRY_RUN", default_value = "true", value_parser = parse_bool, action = ArgAction::Set)]
    pub dry_run: bool,

    /// Cron expression for `schedule` mode (UTC)
    #[arg(long, env = "DHIS2_CRON_SCHEDULE", default_value = "0 2 * * *")]
    pub cron_schedule: String,

    /// Write the data-value payload to this file
    #[arg(long, env = "DHIS2_PAYLOAD_FILE")]
    pub payload_file: Option<PathBuf>,

    /// Days ERA5-Land lags behind real time; later days are not requested
    #[arg(long, env = "ERA5_LATENCY_DAYS", default_value = "5")]
    pub latency_days: u32,

    /// Serve Prometheus metrics on this port in `schedule` mode
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the import once and exit (default)
    Run,
    /// Run the import on the cron schedule until interrupted
    Schedule {
        /// Also run immediately at startup
        #[arg(long)]
        run_on_start: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

fn invalid(name: &'static str, e: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        message: e.to_string(),
    }
}

/// Accepts true/false, 1/0, yes/no, on/off in any case.
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}

/// Validated settings for one import.
#[derive(Clone)]
pub struct ImporterConfig {
    pub cds_url: String,
    pub cds_key: String,
    pub dhis2: Dhis2Config,
    pub data_element_id: String,
    pub variable: String,
    pub value_col: String,
    pub is_cumulative: bool,
    pub from_units: Unit,
    pub to_units: Unit,
    pub temporal_aggregation: Aggregation,
    pub spatial_aggregation: Aggregation,
    pub start_date: NaiveDate,
    /// `None` means "today" at the time of each run
    pub end_date: Option<NaiveDate>,
    pub download_folder: PathBuf,
    pub download_prefix: String,
    pub timezone_offset: i32,
    pub org_unit_level: u32,
    pub import_strategy: ImportStrategy,
    pub dry_run: bool,
    pub cron: CronSchedule,
    pub payload_file: Option<PathBuf>,
    pub latency_days: u32,
}

impl ImporterConfig {
    /// Validate raw arguments. All missing required settings are reported
    /// together.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut require = |value: &Option<String>, name: &'static str| -> String {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let cds_key = require(&args.cdsapi_key, "CDSAPI_KEY");
        let base_url = require(&args.dhis2_base_url, "DHIS2_BASE_URL");
        let username = require(&args.dhis2_username, "DHIS2_USERNAME");
        let password = require(&args.dhis2_password, "DHIS2_PASSWORD");
        let data_element_id = require(&args.data_element_id, "DHIS2_DATA_ELEMENT_ID");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let from_units: Unit = args
            .from_units
            .parse()
            .map_err(|e| invalid("DHIS2_FROM_UNITS", e))?;
        let to_units: Unit = args
            .to_units
            .parse()
            .map_err(|e| invalid("DHIS2_TO_UNITS", e))?;
        // Catches m -> K at startup instead of after a download
        era5_common::units::Conversion::new(from_units, to_units)
            .map_err(|e| invalid("DHIS2_TO_UNITS", e))?;

        let temporal_aggregation = args
            .temporal_aggregation
            .parse()
            .map_err(|e| invalid("DHIS2_TEMPORAL_AGGREGATION", e))?;
        let spatial_aggregation = args
            .spatial_aggregation
            .parse()
            .map_err(|e| invalid("DHIS2_SPATIAL_AGGREGATION", e))?;

        let start_date =
            parse_iso_date(&args.start_date).map_err(|e| invalid("DHIS2_START_DATE", e))?;
        let end_date = args
            .end_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_iso_date)
            .transpose()
            .map_err(|e| invalid("DHIS2_END_DATE", e))?;
        if let Some(end) = end_date {
            DateRange::new(start_date, end).map_err(|e| invalid("DHIS2_END_DATE", e))?;
        }

        let import_strategy = args
            .import_strategy
            .parse()
            .map_err(|e| invalid("DHIS2_IMPORT_STRATEGY", e))?;

        let cron =
            CronSchedule::parse(&args.cron_schedule).map_err(|e| invalid("DHIS2_CRON_SCHEDULE", e))?;

        if !(-12..=14).contains(&args.timezone_offset) {
            return Err(invalid(
                "DHIS2_TIMEZONE_OFFSET",
                format!("{} is outside -12..=14 hours", args.timezone_offset),
            ));
        }

        Ok(Self {
            cds_url: args.cdsapi_url.clone(),
            cds_key,
            dhis2: Dhis2Config::new(base_url, username, password),
            data_element_id,
            variable: args.variable.clone(),
            value_col: args.value_col.clone(),
            is_cumulative: args.is_cumulative,
            from_units,
            to_units,
            temporal_aggregation,
            spatial_aggregation,
            start_date,
            end_date,
            download_folder: args.download_folder.clone(),
            download_prefix: args.download_prefix.clone(),
            timezone_offset: args.timezone_offset,
            org_unit_level: args.org_unit_level,
            import_strategy,
            dry_run: args.dry_run,
            cron,
            payload_file: args.payload_file.clone(),
            latency_days: args.latency_days,
        })
    }

    /// The configured date range as of `today`.
    ///
    /// The end is clipped to the last day ERA5-Land can have published. West
    /// of UTC one more day is held back, since the last local day needs the
    /// UTC day after it. `None` when that leaves nothing, e.g. a start date
    /// in the future.
    pub fn configured_range(&self, today: NaiveDate) -> Option<DateRange> {
        let held_back = self.latency_days as i64 + i64::from(self.timezone_offset < 0);
        let available = today - Duration::days(held_back);
        let end = self.end_date.unwrap_or(today).min(available);
        DateRange::non_empty(self.start_date, end)
    }
}

impl fmt::Debug for ImporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImporterConfig")
            .field("cds_url", &self.cds_url)
            .field("cds_key", &"***")
            .field("dhis2", &self.dhis2)
            .field("data_element_id", &self.data_element_id)
            .field("variable", &self.variable)
            .field("value_col", &self.value_col)
            .field("is_cumulative", &self.is_cumulative)
            .field("from_units", &self.from_units)
            .field("to_units", &self.to_units)
            .field("temporal_aggregation", &self.temporal_aggregation)
            .field("spatial_aggregation", &self.spatial_aggregation)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("download_folder", &self.download_folder)
            .field("download_prefix", &self.download_prefix)
            .field("timezone_offset", &self.timezone_offset)
            .field("org_unit_level", &self.org_unit_level)
            .field("import_strategy", &self.import_strategy)
            .field("dry_run", &self.dry_run)
            .field("cron", &self.cron)
            .field("payload_file", &self.payload_file)
            .field("latency_days", &self.latency_days)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 11] = [
        "era5-importer",
        "--cdsapi-key",
        "abc-123",
        "--dhis2-base-url",
        "https://dhis2.example.org",
        "--dhis2-username",
        "admin",
        "--dhis2-password",
        "district",
        "--data-element-id",
        "sB79w2hiLp8",
    ];

    fn args(extra: &[&str]) -> Args {
        Args::try_parse_from(REQUIRED.iter().chain(extra)).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("no"), Ok(false));
        assert_eq!(parse_bool("0"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ImporterConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.variable, "total_precipitation");
        assert_eq!(config.value_col, "tp");
        assert!(config.is_cumulative);
        assert_eq!(config.from_units, Unit::Metre);
        assert_eq!(config.to_units, Unit::Millimetre);
        assert_eq!(config.temporal_aggregation, Aggregation::Sum);
        assert_eq!(config.spatial_aggregation, Aggregation::Mean);
        assert_eq!(config.start_date, d(2025, 1, 1));
        assert_eq!(config.org_unit_level, 2);
        assert!(config.dry_run);
        assert_eq!(config.latency_days, 5);
        assert_eq!(config.import_strategy, ImportStrategy::CreateAndUpdate);
    }

    #[test]
    fn test_explicit_values() {
        let config = ImporterConfig::from_args(&args(&[
            "--dry-run",
            "false",
            "--timezone-offset",
            "-3",
            "--temporal-aggregation",
            "max",
            "--end-date",
            "2025-03-31",
            "--import-strategy",
            "update",
        ]))
        .unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.timezone_offset, -3);
        assert_eq!(config.temporal_aggregation, Aggregation::Max);
        assert_eq!(config.end_date, Some(d(2025, 3, 31)));
        assert_eq!(config.import_strategy, ImportStrategy::Update);
    }

    #[test]
    fn test_missing_required_are_reported_together() {
        let args = Args::try_parse_from(["era5-importer", "--cdsapi-key", "abc"]).unwrap();
        // Only meaningful when the environment does not supply them
        if args.dhis2_base_url.is_some() {
            return;
        }
        match ImporterConfig::from_args(&args) {
            Err(ConfigError::Missing(names)) => {
                assert!(names.contains(&"DHIS2_BASE_URL"));
                assert!(names.contains(&"DHIS2_PASSWORD"));
                assert!(!names.contains(&"CDSAPI_KEY"));
            }
            other => panic!("expected missing settings, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            vec!["--to-units", "furlongs"],
            vec!["--to-units", "K"],
            vec!["--spatial-aggregation", "median"],
            vec!["--start-date", "2025-13-01"],
            vec!["--start-date", "2025-02-01", "--end-date", "2025-01-01"],
            vec!["--cron-schedule", "every day"],
            vec!["--import-strategy", "REPLACE"],
        ];
        for extra in bad {
            assert!(
                matches!(
                    ImporterConfig::from_args(&args(&extra)),
                    Err(ConfigError::Invalid { .. })
                ),
                "{:?} should be rejected",
                extra
            );
        }
    }

    #[test]
    fn test_configured_range_clips_to_latency() {
        let config = ImporterConfig::from_args(&args(&["--start-date", "2025-01-01"])).unwrap();
        let range = config.configured_range(d(2025, 3, 10)).unwrap();
        assert_eq!(range.start, d(2025, 1, 1));
        assert_eq!(range.end, d(2025, 3, 5));

        // start date after the last published day
        let config = ImporterConfig::from_args(&args(&["--start-date", "2025-03-08"])).unwrap();
        assert!(config.configured_range(d(2025, 3, 10)).is_none());
    }

    #[test]
    fn test_configured_range_west_of_utc_holds_back_a_day() {
        let config = ImporterConfig::from_args(&args(&["--timezone-offset", "-4"])).unwrap();
        assert_eq!(config.configured_range(d(2025, 3, 10)).unwrap().end, d(2025, 3, 4));

        let config = ImporterConfig::from_args(&args(&["--timezone-offset", "4"])).unwrap();
        assert_eq!(config.configured_range(d(2025, 3, 10)).unwrap().end, d(2025, 3, 5));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ImporterConfig::from_args(&args(&[])).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("abc-123"));
        assert!(!printed.contains("district"));
    }

    #[test]
    fn test_subcommands() {
        let args = Args::try_parse_from(["era5-importer", "schedule", "--run-on-start"]).unwrap();
        assert_eq!(args.command, Some(Command::Schedule { run_on_start: true }));

        let args = Args::try_parse_from(["era5-importer"]).unwrap();
        assert_eq!(args.command, None);
    }
}
