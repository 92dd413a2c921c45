mod config;
mod error;
mod loader;
mod records;
mod repair;
mod utils;
mod writer;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use repair::RepairReport;

/// Fills in missing final-stop arrival times in timetable files using the
/// first departure time of each train's continuation run.
#[derive(Parser)]
struct Args {
    /// Directory holding repair.toml.
    #[clap(long, default_value = "./config")]
    config_path: String,
    /// Timetable file pattern, overriding the config.
    #[clap(long)]
    pattern: Option<String>,
    /// Report the repairs without writing any file.
    #[clap(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = config::read_config(&args.config_path).context("Reading config")?;
    if let Some(pattern) = args.pattern {
        config.pattern = pattern;
    }

    run(&config, args.dry_run)?;
    Ok(())
}

/// Load, repair, then write. Nothing is written unless loading and repairing
/// both succeed.
fn run(config: &config::Config, dry_run: bool) -> Result<RepairReport> {
    let mut files = loader::load_timetable_files(&config.pattern)
        .with_context(|| format!("Loading timetables matching {}", config.pattern))?;

    let report = repair::repair_arrival_gaps(&mut files).context("Repairing arrival times")?;
    report.log();

    if dry_run {
        info!("Dry run, no files written");
        return Ok(report);
    }
    writer::write_timetable_files(&files, config.indent).context("Writing timetables")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::path::Path;

    fn write_fixture(dir: &Path, name: &str, value: Value) {
        fs_err::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn read_value(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&fs_err::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(
            dir.path(),
            "jreast-tsurumi.json",
            json!([{
                "id": "A",
                "tt": [{"s": "Tsurumi", "d": "09:40"}, {"s": "Asano", "d": "10:00"}],
                "nt": ["B"]
            }]),
        );
        write_fixture(
            dir.path(),
            "jreast-tsurumiokawabranch.json",
            json!([
                {"id": "B", "tt": [{"s": "Asano", "d": "10:05", "a": "10:04"}, {"s": "Okawa", "a": "10:09"}]},
                {"id": "E", "tt": [{"s": "Okawa", "d": "10:30"}, {"s": "Asano", "a": "10:36"}]}
            ]),
        );
        write_fixture(
            dir.path(),
            "jreast-tsurumiumishibaurabranch.json",
            json!([{"id": "C", "tt": [{"s": "Umishibaura", "d": "11:00"}, {"s": "Asano", "a": "11:07"}]}]),
        );
        dir
    }

    fn config_for(dir: &Path) -> config::Config {
        config::Config {
            pattern: dir.join("jreast-tsurumi*.json").to_string_lossy().into_owned(),
            indent: 4,
        }
    }

    #[test]
    fn test_run_repairs_and_rewrites_files() {
        let dir = fixture_dir();
        let branch_before = read_value(dir.path(), "jreast-tsurumiokawabranch.json");
        let umishibaura_before = read_value(dir.path(), "jreast-tsurumiumishibaurabranch.json");

        let report = run(&config_for(dir.path()), false).unwrap();
        assert_eq!(report.repairs.len(), 1);

        let main_line = read_value(dir.path(), "jreast-tsurumi.json");
        assert_eq!(
            main_line[0]["tt"][1],
            json!({"s": "Asano", "d": "10:00", "a": "10:05"})
        );
        assert_eq!(
            read_value(dir.path(), "jreast-tsurumiokawabranch.json"),
            branch_before
        );
        assert_eq!(
            read_value(dir.path(), "jreast-tsurumiumishibaurabranch.json"),
            umishibaura_before
        );
        // Rewritten with the 4-space layout.
        let text = fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap();
        assert!(text.starts_with("[\n    {\n        \"id\": \"A\""));
    }

    #[test]
    fn test_second_run_produces_identical_files() {
        let dir = fixture_dir();
        let config = config_for(dir.path());
        run(&config, false).unwrap();
        let once = fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap();

        let report = run(&config, false).unwrap();
        assert!(report.is_empty());
        let twice = fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_lookup_failure_writes_nothing() {
        let dir = fixture_dir();
        write_fixture(
            dir.path(),
            "jreast-tsurumiumishibaurabranch.json",
            json!([{"id": "C", "tt": [{"s": "Umishibaura", "d": "11:00"}], "nt": ["MISSING"]}]),
        );
        let before = fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap();

        let err = run(&config_for(dir.path()), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<error::RepairError>(),
            Some(error::RepairError::NextTrainNotFound { .. })
        ));
        assert_eq!(
            fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap(),
            before
        );
    }

    #[test]
    fn test_dry_run_leaves_files_alone() {
        let dir = fixture_dir();
        let before = fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap();

        let report = run(&config_for(dir.path()), true).unwrap();
        assert_eq!(report.repairs.len(), 1);
        assert_eq!(
            fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap(),
            before
        );
    }

    #[test]
    fn test_no_matching_files_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs_err::write(dir.path().join("jreast-nambu.json"), "[]").unwrap();

        let report = run(&config_for(dir.path()), false).unwrap();
        assert!(report.is_empty());
        assert_eq!(
            fs_err::read_to_string(dir.path().join("jreast-nambu.json")).unwrap(),
            "[]"
        );

        let report = run(&config_for(&dir.path().join("missing")), false).unwrap();
        assert!(report.is_empty());
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_nothing_to_repair_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let text = "[\n    {\n        \"id\": \"C\",\n        \"tt\": [\n            {\n                \"d\": \"11:00\",\n                \"a\": \"10:59\"\n            }\n        ]\n    }\n]";
        fs_err::write(dir.path().join("jreast-tsurumi.json"), text).unwrap();

        let report = run(&config_for(dir.path()), false).unwrap();
        assert!(report.is_empty());
        assert_eq!(
            fs_err::read_to_string(dir.path().join("jreast-tsurumi.json")).unwrap(),
            text
        );
    }
}
