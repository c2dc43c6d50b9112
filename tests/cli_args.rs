//! Integration tests for CLI argument handling
//!
//! Tests flag parsing, source selection and the offline modes of the binary.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_news-agent"))
        .args(args)
        .output()
        .expect("Failed to execute news-agent")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("news-agent"), "Help should mention news-agent");
    assert!(stdout.contains("--sources"), "Help should mention --sources flag");
    assert!(stdout.contains("--no-cache"), "Help should mention --no-cache flag");
}

#[test]
fn test_invalid_source_prints_error_and_exits() {
    let output = run_cli(&["--sources", "slashdot", "--dry-run"]);
    assert!(!output.status.success(), "Expected invalid source to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("slashdot"),
        "Should print error message about invalid source: {}",
        stderr
    );
}

#[test]
fn test_dry_run_lists_targets_and_cache_keys() {
    let output = run_cli(&["--dry-run", "--sources", "hn"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hacker News top"), "stdout: {}", stdout);
    assert!(stdout.contains("hn_top:30"), "stdout: {}", stdout);
    assert!(!stdout.contains("GitHub"), "Only the selected source should be listed");
}

#[test]
fn test_dry_run_uses_config_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[sources.github]\nenabled = false\n[sources.hackernews]\nendpoints = [\"best\", \"show\"]\nlimit = 5\n",
    )
    .unwrap();

    let output = run_cli(&["--dry-run", "--config", path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hn_best:5"), "stdout: {}", stdout);
    assert!(stdout.contains("hn_show:5"), "stdout: {}", stdout);
    assert!(!stdout.contains("github_trending"));
}

#[test]
fn test_invalid_config_fails_at_startup() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[analysis]\ntop_n = 0\n").unwrap();

    let output = run_cli(&["--dry-run", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("analysis.top_n"), "stderr: {}", stderr);
}

/// Linux-only: the cache directory is redirected through `XDG_CACHE_HOME`
#[cfg(target_os = "linux")]
#[test]
fn test_clear_cache_removes_files_even_when_caching_disabled() {
    let xdg_dir = tempfile::TempDir::new().unwrap();
    let cache_dir = xdg_dir.path().join("news-agent");
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join("0123abcd.json"), "{}").unwrap();
    std::fs::write(cache_dir.join(".partial-abc.tmp"), "{").unwrap();

    let config_dir = tempfile::TempDir::new().unwrap();
    let config_path = config_dir.path().join("config.toml");
    std::fs::write(&config_path, "[caching]\nenabled = false\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_news-agent"))
        .args(["--clear-cache", "--config", config_path.to_str().unwrap()])
        .env("XDG_CACHE_HOME", xdg_dir.path())
        .output()
        .expect("Failed to execute news-agent");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 files removed"), "stdout: {}", stdout);
    assert!(stdout.contains("caching is disabled"), "stdout: {}", stdout);
    assert_eq!(std::fs::read_dir(&cache_dir).unwrap().count(), 0);
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use news_agent::cli::{parse_source_arg, Cli, CliError, RunOptions};
    use news_agent::ranking::RankingStrategy;
    use news_agent::sources::SourceKind;

    #[test]
    fn test_cli_no_args_selects_configured_sources() {
        let cli = Cli::parse_from(["news-agent"]);
        let options = RunOptions::from_cli(&cli).unwrap();
        assert!(options.sources.is_none());
        assert!(!options.force_refresh);
    }

    #[test]
    fn test_cli_sources_flag() {
        let cli = Cli::parse_from(["news-agent", "--sources", "hn"]);
        let options = RunOptions::from_cli(&cli).unwrap();
        assert_eq!(options.sources, Some(vec![SourceKind::HackerNews]));
    }

    #[test]
    fn test_cli_strategy_flag() {
        let cli = Cli::parse_from(["news-agent", "--strategy", "Balanced"]);
        let options = RunOptions::from_cli(&cli).unwrap();
        assert_eq!(options.strategy, Some(RankingStrategy::Balanced));
    }

    #[test]
    fn test_parse_source_arg_invalid_returns_error() {
        assert_eq!(
            parse_source_arg("invalid"),
            Err(CliError::InvalidSource("invalid".to_string()))
        );
    }

    #[test]
    fn test_no_cache_means_force_refresh() {
        let cli = Cli::parse_from(["news-agent", "--no-cache"]);
        assert!(RunOptions::from_cli(&cli).unwrap().force_refresh);
    }
}
