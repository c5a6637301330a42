//! Windline command line harness
//!
//! Loads a course trace, a wind field and optionally a polar table and a
//! detection config from JSON files, runs the engine once and prints the
//! report as JSON on stdout.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use serde::de::DeserializeOwned;

use windline_core::{
    CourseTrace, DetectionConfig, DetectionOutcome, LinearTrendPredictor, PolarTable,
    StrategyEngine, VmgCalculator, WindField,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect strategic decision points on a sailing race course",
    long_about = None
)]
struct Cli {
    /// Course trace JSON: {"legs": [{"path_points": [{lat, lon, timestamp}]}]}
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    course: PathBuf,

    /// Wind field JSON with nested row grids
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    wind: PathBuf,

    /// Detection config JSON, defaults for anything missing
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Polar table and course marks JSON, enables tack and layline detection
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    polar: Option<PathBuf>,

    /// Forecast wind veer, degrees per hour (enables the trend forecast)
    #[arg(long, allow_hyphen_values = true)]
    veer: Option<f64>,

    /// Forecast wind speed trend, knots per hour (enables the trend forecast)
    #[arg(long, allow_hyphen_values = true)]
    speed_trend: Option<f64>,

    /// Minimum wind shift probability reported
    #[arg(long)]
    threshold: Option<f64>,

    /// Detect on the current wind field only
    #[arg(long)]
    no_propagation: bool,

    /// Write the report here instead of stdout
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {} file {}", what, path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("cannot parse {} file {}", what, path.display()))
}

impl Cli {
    fn detection_config(&self) -> Result<DetectionConfig> {
        let mut config: DetectionConfig = match &self.config {
            Some(path) => load_json(path, "config")?,
            None => DetectionConfig::default(),
        };
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if self.no_propagation {
            config.propagation.enabled = false;
        }
        config.validate().context("invalid detection config")?;
        Ok(config)
    }

    fn predictor(&self) -> Option<LinearTrendPredictor> {
        if self.veer.is_none() && self.speed_trend.is_none() {
            return None;
        }
        Some(LinearTrendPredictor {
            veer_deg_per_hour: self.veer.unwrap_or(0.0),
            speed_trend_kn_per_hour: self.speed_trend.unwrap_or(0.0),
            ..Default::default()
        })
    }

    fn engine(&self) -> Result<StrategyEngine> {
        let mut engine = StrategyEngine::new(self.detection_config()?)?;
        if let Some(predictor) = self.predictor() {
            log::info!(
                "trend forecast: veer {}°/h, speed {} kn/h",
                predictor.veer_deg_per_hour,
                predictor.speed_trend_kn_per_hour
            );
            engine = engine.with_predictor(predictor);
        }
        if let Some(path) = &self.polar {
            let polar: PolarTable = load_json(path, "polar")?;
            let polar = polar.normalized();
            log::info!(
                "polar table with {} rows, {} marks",
                polar.angles().len(),
                polar.marks().len()
            );
            engine = engine.with_vmg_calculator(polar);
        }
        Ok(engine)
    }
}

fn run(cli: &Cli) -> Result<DetectionOutcome> {
    let course: CourseTrace = load_json(&cli.course, "course")?;
    let field: WindField = load_json(&cli.wind, "wind field")?;
    let mut engine = cli.engine()?;

    log::info!(
        "analyzing {} legs, {} track points on a {:?} wind grid",
        course.legs.len(),
        course.point_count(),
        field.shape()
    );
    let outcome = engine.detect(&course, &field).context("detection failed")?;

    let stats = engine.cache_stats();
    log::debug!(
        "geometry cache: {} hits, {} misses, {} resets",
        stats.hits,
        stats.misses,
        stats.resets
    );
    for reason in outcome.reasons() {
        log::warn!("{}", reason);
    }
    log::info!("{} strategy points", outcome.points().len());
    Ok(outcome)
}

fn write_report(outcome: &DetectionOutcome, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("cannot serialize report")?;
    match output {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("cannot write report to {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json).context("cannot write report to stdout")
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let outcome = run(&cli)?;
    write_report(&outcome, cli.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const COURSE: &str = r#"{"legs": [{"path_points": [
        {"lat": 0.05, "lon": 0.0, "timestamp": "2024-05-01T10:00:00Z"},
        {"lat": 0.05, "lon": 0.3, "timestamp": "2024-05-01T10:01:00Z"}
    ]}]}"#;

    const WIND: &str = r#"{
        "lat_grid": [[0.0, 0.0, 0.0, 0.0], [0.1, 0.1, 0.1, 0.1]],
        "lon_grid": [[0.0, 0.1, 0.2, 0.3], [0.0, 0.1, 0.2, 0.3]],
        "wind_direction": [[270, 270, 300, 300], [270, 270, 300, 300]],
        "wind_speed": [[12, 12, 12, 12], [12, 12, 12, 12]],
        "confidence": [[1, 1, 1, 1], [1, 1, 1, 1]],
        "timestamp": "2024-05-01T10:00:00Z"
    }"#;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("windline").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_run_without_polar_degrades() {
        let course = json_file(COURSE);
        let wind = json_file(WIND);
        let cli = cli(&[
            "--course",
            course.path().to_str().unwrap(),
            "--wind",
            wind.path().to_str().unwrap(),
        ]);

        let outcome = run(&cli).unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(outcome.points().len(), 1);
        assert_eq!(outcome.reasons().len(), 2);
    }

    #[test]
    fn test_config_file_and_overrides() {
        let config = json_file(r#"{"confidence_threshold": 0.5, "detectors": "WIND_SHIFT"}"#);
        let cli = cli(&[
            "-c",
            "course.json",
            "-w",
            "wind.json",
            "--config",
            config.path().to_str().unwrap(),
            "--threshold",
            "0.9",
            "--no-propagation",
        ]);
        let config = cli.detection_config().unwrap();
        assert_eq!(config.confidence_threshold, 0.9);
        assert!(!config.propagation.enabled);
        assert_eq!(config.detectors, windline_core::DetectorSet::WIND_SHIFT);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let cli = cli(&["-c", "course.json", "-w", "wind.json", "--threshold", "1.5"]);
        let err = cli.detection_config().unwrap_err();
        assert!(format!("{:#}", err).contains("confidence_threshold 1.5"));
    }

    #[test]
    fn test_trend_flags_build_predictor() {
        let plain = cli(&["-c", "a", "-w", "b"]);
        assert!(plain.predictor().is_none());

        let trend = cli(&["-c", "a", "-w", "b", "--veer", "-6", "--speed-trend", "1.5"]);
        let predictor = trend.predictor().unwrap();
        assert_eq!(predictor.veer_deg_per_hour, -6.0);
        assert_eq!(predictor.speed_trend_kn_per_hour, 1.5);
    }

    #[test]
    fn test_missing_file_has_context() {
        let wind = json_file(WIND);
        let cli = cli(&["-c", "/nonexistent/course.json", "-w", wind.path().to_str().unwrap()]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("cannot read course file"));
    }

    #[test]
    fn test_report_written_to_file() {
        let course = json_file(COURSE);
        let wind = json_file(WIND);
        let polar = json_file(
            r#"{"angles": [{"wind_speed": 10, "upwind_angle": 42, "downwind_angle": 150}],
                "marks": [{"id": "W1", "lat": 0.1, "lon": 0.3, "type": "windward"}]}"#,
        );
        let cli = cli(&[
            "-c",
            course.path().to_str().unwrap(),
            "-w",
            wind.path().to_str().unwrap(),
            "-p",
            polar.path().to_str().unwrap(),
        ]);
        let outcome = run(&cli).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&outcome, Some(&path)).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["status"], "complete");
        assert_eq!(report["points"][0]["type"], "wind_shift");
    }
}
