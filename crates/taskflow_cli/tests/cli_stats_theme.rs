use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskflow-{nanos}-{file_name}"))
}

fn taskflow_with_config(
    store_path: &PathBuf,
    config_path: &PathBuf,
    args: &[&str],
) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_taskflow"))
        .args(args)
        .env("TASKFLOW_STORE_PATH", store_path)
        .env("TASKFLOW_CONFIG_PATH", config_path)
        .output()
        .expect("failed to run taskflow")
}

fn taskflow(store_path: &PathBuf, args: &[&str]) -> std::process::Output {
    taskflow_with_config(store_path, &temp_path("absent-config.json"), args)
}

#[test]
fn stats_command_reports_today_completion() {
    let store_path = temp_path("cli-stats.json");
    taskflow(&store_path, &["add", "Buy milk", "-p", "low"]);
    let added = taskflow(&store_path, &["add", "Write report", "-p", "high", "--json"]);
    let task: serde_json::Value = serde_json::from_slice(&added.stdout).unwrap();
    taskflow(&store_path, &["toggle", task["id"].as_str().unwrap()]);

    let output = taskflow(&store_path, &["stats", "--json"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["done"], 1);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["percent"], 50);
    let weekly = stats["weekly"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6]["count"], 1);
    assert_eq!(stats["distribution"][0]["label"], "Completed");
}

#[test]
fn stats_command_plain_output() {
    let store_path = temp_path("cli-stats-plain.json");

    let output = taskflow(&store_path, &["stats"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Progress: 0%"));
    assert!(stdout.contains("No tasks: 1"));
}

#[test]
fn charts_command_prints_both_configs() {
    let store_path = temp_path("cli-charts.json");

    let output = taskflow(&store_path, &["charts"]);

    assert!(output.status.success());
    let charts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(charts["weekly"]["type"], "bar");
    assert_eq!(charts["status"]["type"], "doughnut");
    assert_eq!(charts["status"]["data"]["labels"][0], "No tasks");
}

#[test]
fn theme_toggle_persists() {
    let store_path = temp_path("cli-theme.json");

    let before = taskflow(&store_path, &["theme"]);
    let toggled = taskflow(&store_path, &["theme", "toggle"]);
    let after = taskflow(&store_path, &["theme", "show", "--json"]);
    let file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).unwrap();
    std::fs::remove_file(&store_path).ok();

    assert!(String::from_utf8_lossy(&before.stdout).contains("Theme: light"));
    assert!(toggled.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&after.stdout).unwrap();
    assert_eq!(shown["theme"], "dark");
    assert_eq!(file["entries"]["taskflow_theme"], "dark");
}

#[test]
fn configured_theme_is_the_default() {
    let store_path = temp_path("cli-theme-config.json");
    let config_path = temp_path("cli-theme-config-file.json");
    std::fs::write(&config_path, r#"{"theme":"noir"}"#).unwrap();

    let output = taskflow_with_config(&store_path, &config_path, &["theme", "--json"]);
    let overridden = taskflow_with_config(
        &store_path,
        &config_path,
        &["theme", "--json", "--config-override", "theme=light"],
    );
    std::fs::remove_file(&config_path).ok();

    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["theme"], "dark");
    let shown: serde_json::Value = serde_json::from_slice(&overridden.stdout).unwrap();
    assert_eq!(shown["theme"], "light");
}

#[test]
fn invalid_override_is_rejected() {
    let store_path = temp_path("cli-bad-override.json");

    let output = taskflow(&store_path, &["theme", "--config-override", "colour=red"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}
