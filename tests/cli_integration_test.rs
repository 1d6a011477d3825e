//! CLI integration tests with real INI, CSV, JSON and SQLite files on disk.
//!
//! Tests cover:
//! - `backtest`: full run writing every configured sink
//! - `validate`: exit codes for good and bad configs
//! - `simulate`: replaying an exported signals table
//! - Command-line overrides layered over the config file

mod common;

use clap::Parser;
use common::*;
use crosstrader::cli::{self, Cli};
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn exit_code_eq(actual: ExitCode, expected: ExitCode) -> bool {
    // ExitCode does not implement PartialEq
    format!("{actual:?}") == format!("{expected:?}")
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["crosstrader"];
    argv.extend_from_slice(args);
    cli::run(Cli::parse_from(argv))
}

fn ini_for(dir: &Path) -> String {
    format!(
        r#"
[backtest]
ticker = TEST
start_date = 2023-01-01
end_date = 2024-01-01
initial_capital = $10,000
trade_cost = 5

[strategy]
short_window = 5
long_window = 20
use_ml = true

[data]
csv_dir = {dir}

[output]
json_path = {dir}/results.json
chart_path = {dir}/chart.svg
show_ml = true
log_scale = true

[sqlite]
path = {dir}/results.db
"#,
        dir = dir.display()
    )
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_json_chart_and_database() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "TEST", &choppy(120));
        let ini = write_temp_ini(&ini_for(dir.path()));

        let code = run_args(&["backtest", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::SUCCESS));

        let doc = read_json(&dir.path().join("results.json"));
        let portfolio = doc["portfolio"].as_object().unwrap();
        let signals = doc["signals"].as_object().unwrap();
        for column in ["Date", "Cash", "Holdings", "Total"] {
            assert_eq!(portfolio[column].as_array().unwrap().len(), 120, "{column}");
        }
        for column in [
            "Date", "Close", "Short_MA", "Long_MA", "Signal", "Position", "Return",
            "Next_Return", "Target", "Ret_1", "Ret_3", "Ret_5", "ML_Signal", "ML_Confidence",
        ] {
            assert_eq!(signals[column].as_array().unwrap().len(), 120, "{column}");
        }
        assert_eq!(signals["Date"][0], "2023-01-02");
        assert!(signals["Return"][0].is_null());
        assert!(signals["Next_Return"][119].is_null());
        assert!(signals["Target"][119].is_null());

        let chart = std::fs::read_to_string(dir.path().join("chart.svg")).unwrap();
        assert!(chart.starts_with("<svg"));
        assert!(chart.contains("ml-confidence"));

        #[cfg(feature = "sqlite")]
        {
            use crosstrader::adapters::sqlite_adapter::SqliteAdapter;
            let store = SqliteAdapter::open(&dir.path().join("results.db")).unwrap();
            let rows = store.load_portfolio().unwrap();
            assert_eq!(rows.len(), 120);
            let totals = portfolio["Total"].as_array().unwrap();
            assert_eq!(rows[119].total, totals[119].as_f64().unwrap());
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "OTHER", &one_round_trip(60));
        let ini = write_temp_ini(&ini_for(dir.path()));

        let code = run_args(&[
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--ticker",
            "other",
            "--capital",
            "1,005",
            "--no-ml",
        ]);
        assert!(exit_code_eq(code, ExitCode::SUCCESS));

        let doc = read_json(&dir.path().join("results.json"));
        let cash = doc["portfolio"]["Cash"].as_array().unwrap();
        assert_eq!(cash[0], 1005.0);
        let ml = doc["signals"]["ML_Confidence"].as_array().unwrap();
        assert!(ml.iter().all(|v| v.as_f64() == Some(0.0)));
    }

    #[test]
    fn missing_csv_is_data_error() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&ini_for(dir.path()));
        let code = run_args(&["backtest", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(5)));
        assert!(!dir.path().join("results.json").exists());
    }

    #[test]
    fn short_history_is_data_error() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "TEST", &choppy(59));
        let ini = write_temp_ini(&ini_for(dir.path()));
        let code = run_args(&["backtest", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(5)));
    }

    #[test]
    fn capital_below_one_share_is_simulation_error() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "TEST", &flat(70, 500.0));
        let ini = write_temp_ini(&ini_for(dir.path()));
        let code = run_args(&[
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--capital",
            "100",
        ]);
        assert!(exit_code_eq(code, ExitCode::from(6)));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let code = run_args(&["backtest", "--config", "/nonexistent/crosstrader.ini"]);
        assert!(exit_code_eq(code, ExitCode::from(2)));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let dir = TempDir::new().unwrap();
        let ini = write_temp_ini(&ini_for(dir.path()));
        let code = run_args(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::SUCCESS));
    }

    #[test]
    fn inverted_windows_fail() {
        let ini = write_temp_ini(
            "[backtest]\nticker = AAPL\nstart_date = 2020-01-01\nend_date = 2021-01-01\n\
             [strategy]\nshort_window = 100\nlong_window = 40\n",
        );
        let code = run_args(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(2)));
    }

    #[test]
    fn unparseable_trade_cost_fails() {
        let ini = write_temp_ini(
            "[backtest]\nticker = AAPL\nstart_date = 2020-01-01\nend_date = 2021-01-01\n\
             trade_cost = abc\n",
        );
        let code = run_args(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(2)));
    }

    #[test]
    fn bad_dates_fail() {
        let ini = write_temp_ini(
            "[backtest]\nticker = AAPL\nstart_date = 2021-01-01\nend_date = 2020-01-01\n",
        );
        let code = run_args(&["validate", "--config", ini.path().to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(2)));
    }
}

mod simulate_command {
    use super::*;

    #[test]
    fn replays_exported_signals() {
        let dir = TempDir::new().unwrap();
        write_csv(dir.path(), "TEST", &one_round_trip(60));
        let ini = write_temp_ini(&ini_for(dir.path()));
        let code = run_args(&[
            "backtest",
            "--config",
            ini.path().to_str().unwrap(),
            "--capital",
            "1005",
            "--no-ml",
        ]);
        assert!(exit_code_eq(code, ExitCode::SUCCESS));

        let results = dir.path().join("results.json");
        let out = dir.path().join("replay.json");
        let code = run_args(&[
            "simulate",
            "--signals",
            results.to_str().unwrap(),
            "--capital",
            "1005",
            "--output",
            out.to_str().unwrap(),
        ]);
        assert!(exit_code_eq(code, ExitCode::SUCCESS));

        let original = read_json(&results);
        let replay = read_json(&out);
        assert_eq!(original["portfolio"], replay["portfolio"]);
    }

    #[test]
    fn round_trip_through_signal_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signals.json");
        std::fs::write(
            &path,
            r#"{
                "Date": ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"],
                "Close": [9.0, 10.0, 15.0, 20.0],
                "Signal": [0, 1, 1, 0],
                "Position": [0, 1, 0, -1]
            }"#,
        )
        .unwrap();

        let table = cli::simulate_from_file(&path, "$1,005", 5.0, None).unwrap();
        assert_eq!(table.cash[1], 0.0);
        assert_eq!(table.holdings[2], 1500.0);
        assert!((table.total[3] - 1995.0).abs() < 1e-9);
    }

    #[test]
    fn missing_columns_is_strategy_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signals.json");
        std::fs::write(&path, r#"{"Date": ["2024-01-01"], "Close": [1.0]}"#).unwrap();

        let code = run_args(&["simulate", "--signals", path.to_str().unwrap()]);
        assert!(exit_code_eq(code, ExitCode::from(4)));
    }

    #[test]
    fn unreadable_signals_is_io_error() {
        let code = run_args(&["simulate", "--signals", "/nonexistent/signals.json"]);
        assert!(exit_code_eq(code, ExitCode::from(1)));
    }
}
