use std::process::ExitCode;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ja_core::{Error, Result, SimilarityModel};
use ja_scrapers::cli::{handle_command, AggregatorCommands};
use ja_scrapers::logging::{init_logging, level_for};
use ja_scrapers::RunOutcome;

const EXIT_FOUND: u8 = 0;
const EXIT_EMPTY: u8 = 1;
const EXIT_FAILURE: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "ja", author, version, about = "Search job boards for recent postings", long_about = None)]
pub struct Cli {
    /// More log output; repeat for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[arg(long, global = true, default_value = "bow", help = "Similarity model for --group and --similar-to. Available models: bow (default), ollama")]
    model: String,
    /// Backend model name, e.g. nomic-embed-text
    #[arg(long, global = true)]
    model_name: Option<String>,
    #[arg(long, global = true)]
    model_url: Option<String>,
    #[command(subcommand)]
    command: AggregatorCommands,
}

fn exit_status(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(RunOutcome::Found) => EXIT_FOUND,
        Ok(RunOutcome::Empty) => EXIT_EMPTY,
        Ok(RunOutcome::SearchUnavailable) => EXIT_FAILURE,
        Err(Error::Cancelled) => EXIT_CANCELLED,
        Err(_) => EXIT_FAILURE,
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    cli.command.validate()?;
    let model = if cli.command.needs_model() {
        let config = ja_inference::Config {
            model: cli.model,
            model_name: cli.model_name,
            model_url: cli.model_url,
            ..ja_inference::Config::default()
        };
        let model = ja_inference::create_model(Some(config)).await?;
        info!("🧠 Similarity model initialized successfully (using {})", model.name());
        Some(model)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 Interrupted, stopping...");
                cancel.cancel();
            }
        })
    };

    let result = handle_command(cli.command, model.clone(), cancel).await;
    watcher.abort();

    if let Some(model) = model {
        if let Err(e) = model.shutdown().await {
            warn!("⚠️ Failed to shut down similarity model: {}", e);
        }
    }

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(level_for(cli.verbose, cli.quiet));

    let result = run(cli).await;
    match &result {
        Err(Error::Cancelled) => warn!("Run cancelled"),
        Err(e) => error!("{}", e),
        Ok(_) => {}
    }
    ExitCode::from(exit_status(&result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(RunOutcome::Found)), 0);
        assert_eq!(exit_status(&Ok(RunOutcome::Empty)), 1);
        assert_eq!(exit_status(&Ok(RunOutcome::SearchUnavailable)), 2);
        assert_eq!(exit_status(&Err(Error::Configuration("bad selector".to_string()))), 2);
        assert_eq!(exit_status(&Err(Error::Search("all searches failed".to_string()))), 2);
        assert_eq!(exit_status(&Err(Error::Cancelled)), 130);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ja", "search", "Rust Engineer", "--group", "-vv", "--model", "ollama"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.model, "ollama");
        assert!(cli.command.needs_model());

        let cli = Cli::try_parse_from(["ja", "-q", "boards"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.model, "bow");
        assert!(!cli.command.needs_model());

        assert!(Cli::try_parse_from(["ja", "-q", "-v", "boards"]).is_err());
        assert!(Cli::try_parse_from(["ja", "search", "--max-age", "soon"]).is_err());
    }

    #[tokio::test]
    async fn test_unknown_model_fails_before_searching() {
        let cli = Cli::try_parse_from(["ja", "search", "SRE", "--group", "--model", "spacy"]).unwrap();
        assert!(matches!(run(cli).await, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_invalid_search_fails_before_model_warm_up() {
        let mut server = mockito::Server::new_async().await;
        let embeddings = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_body(r#"{"embedding": [0.1, 0.2]}"#)
            .expect(0)
            .create_async()
            .await;

        let url = server.url();
        let cli = Cli::try_parse_from([
            "ja", "search", "SRE", "--group", "--group-threshold", "2", "--model", "ollama", "--model-url", &url,
        ])
        .unwrap();
        assert!(matches!(run(cli).await, Err(Error::Configuration(_))));

        let cli = Cli::try_parse_from([
            "ja", "search", "SRE", "--similar-to", "2", "-b", "monster.com", "--model", "ollama", "--model-url", &url,
        ])
        .unwrap();
        assert!(matches!(run(cli).await, Err(Error::Configuration(_))));

        embeddings.assert_async().await;
    }
}
