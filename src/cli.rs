//! Command-line interface parsing for news-agent
//!
//! Flags override the matching config file values; [`RunOptions`] is the
//! validated result.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::Config;
use crate::ranking::RankingStrategy;
use crate::sources::SourceKind;

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// The specified source name is not recognized
    #[error("Invalid source: '{0}'. Valid sources: github (gh), hackernews (hn)")]
    InvalidSource(String),

    /// The specified ranking strategy is not recognized
    #[error("Invalid strategy: '{0}'. Valid strategies: popularity, relevance, balanced")]
    InvalidStrategy(String),
}

/// news-agent - Ranked digest of Hacker News stories and trending GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "news-agent")]
#[command(about = "Fetch, rank and print a digest of tech news")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ignore cached data and fetch every source again
    #[arg(long)]
    pub no_cache: bool,

    /// Comma-separated sources to fetch, overriding the config
    ///
    /// Examples:
    ///   news-agent --sources hn
    ///   news-agent --sources github,hn
    #[arg(long, value_name = "SOURCES", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Comma-separated topics for relevance scoring, overriding the config
    #[arg(long, value_name = "TOPICS", value_delimiter = ',')]
    pub topics: Option<Vec<String>>,

    /// Ranking strategy: popularity, relevance or balanced
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<String>,

    /// Print the digest as JSON
    #[arg(long)]
    pub json: bool,

    /// Show what would be fetched without fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Remove every cached entry and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Settings derived from CLI arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub force_refresh: bool,
    /// `None` means the sources enabled in the config
    pub sources: Option<Vec<SourceKind>>,
    pub topics: Option<Vec<String>>,
    pub strategy: Option<RankingStrategy>,
    pub json: bool,
    pub dry_run: bool,
    pub clear_cache: bool,
    pub verbose: bool,
}

/// Parses a source name argument.
///
/// # Returns
/// * `Ok(SourceKind)` for a known name or alias
/// * `Err(CliError::InvalidSource)` otherwise
pub fn parse_source_arg(s: &str) -> Result<SourceKind, CliError> {
    SourceKind::from_name(s).ok_or_else(|| CliError::InvalidSource(s.to_string()))
}

/// Parses a list of source names, dropping duplicates but keeping order
pub fn parse_sources(names: &[String]) -> Result<Vec<SourceKind>, CliError> {
    let mut sources = Vec::new();
    for name in names.iter().filter(|n| !n.trim().is_empty()) {
        let source = parse_source_arg(name)?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    Ok(sources)
}

impl RunOptions {
    /// Creates RunOptions from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Err(CliError)` if a source or the strategy is not recognized
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let sources = cli.sources.as_deref().map(parse_sources).transpose()?;

        let strategy = cli
            .strategy
            .as_deref()
            .map(|s| s.parse::<RankingStrategy>().map_err(|_| CliError::InvalidStrategy(s.to_string())))
            .transpose()?;

        let topics = cli.topics.as_ref().map(|topics| {
            topics
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        });

        Ok(RunOptions {
            config_path: cli.config.clone(),
            force_refresh: cli.no_cache,
            sources,
            topics,
            strategy,
            json: cli.json,
            dry_run: cli.dry_run,
            clear_cache: cli.clear_cache,
            verbose: cli.verbose,
        })
    }

    /// Applies the overrides to a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(topics) = &self.topics {
            config.analysis.topics = topics.clone();
        }
        if let Some(strategy) = self.strategy {
            config.ranking.strategy = strategy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_arg_aliases() {
        assert_eq!(parse_source_arg("hn").unwrap(), SourceKind::HackerNews);
        assert_eq!(parse_source_arg("hackernews").unwrap(), SourceKind::HackerNews);
        assert_eq!(parse_source_arg("gh").unwrap(), SourceKind::GitHub);
        assert_eq!(parse_source_arg("GitHub").unwrap(), SourceKind::GitHub);
    }

    #[test]
    fn test_parse_source_arg_invalid() {
        let err = parse_source_arg("reddit").unwrap_err();
        assert!(err.to_string().contains("Invalid source"));
        assert!(err.to_string().contains("reddit"));
    }

    #[test]
    fn test_parse_sources_dedupes() {
        let names = vec!["hn".to_string(), "github".to_string(), "hackernews".to_string()];
        assert_eq!(
            parse_sources(&names).unwrap(),
            vec![SourceKind::HackerNews, SourceKind::GitHub]
        );
    }

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::parse_from(["news-agent"]);
        let options = RunOptions::from_cli(&cli).unwrap();
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn test_cli_parse_all_flags() {
        let cli = Cli::parse_from([
            "news-agent",
            "--config",
            "/tmp/agent.toml",
            "--no-cache",
            "--sources",
            "github,hn",
            "--topics",
            "rust, llm",
            "--strategy",
            "popularity",
            "--json",
            "--verbose",
        ]);
        let options = RunOptions::from_cli(&cli).unwrap();

        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/agent.toml")));
        assert!(options.force_refresh);
        assert_eq!(options.sources, Some(vec![SourceKind::GitHub, SourceKind::HackerNews]));
        assert_eq!(options.topics, Some(vec!["rust".to_string(), "llm".to_string()]));
        assert_eq!(options.strategy, Some(RankingStrategy::Popularity));
        assert!(options.json);
        assert!(options.verbose);
        assert!(!options.dry_run);
    }

    #[test]
    fn test_run_options_invalid_source() {
        let cli = Cli::parse_from(["news-agent", "--sources", "hn,slashdot"]);
        assert_eq!(
            RunOptions::from_cli(&cli),
            Err(CliError::InvalidSource("slashdot".to_string()))
        );
    }

    #[test]
    fn test_run_options_invalid_strategy() {
        let cli = Cli::parse_from(["news-agent", "--strategy", "random"]);
        assert!(matches!(RunOptions::from_cli(&cli), Err(CliError::InvalidStrategy(_))));
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::parse_from(["news-agent", "--topics", "rust", "--strategy", "relevance"]);
        let options = RunOptions::from_cli(&cli).unwrap();
        let mut config = Config::default();

        options.apply(&mut config);

        assert_eq!(config.analysis.topics, vec!["rust".to_string()]);
        assert_eq!(config.ranking.strategy, RankingStrategy::Relevance);
    }

    #[test]
    fn test_apply_without_overrides_keeps_config() {
        let mut config = Config::default();
        config.analysis.topics = vec!["databases".to_string()];

        RunOptions::default().apply(&mut config);

        assert_eq!(config.analysis.topics, vec!["databases".to_string()]);
        assert_eq!(config.ranking.strategy, RankingStrategy::Balanced);
    }
}
