use clap::Parser;
use emojigate::{Config, GitCli, GitHubApi, OpenAiClient, ReviewMode, run_review};

// Human-readable build info (for clap version display)
const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser)]
#[command(name = "emojigate")]
#[command(
    about = "Gate a pull request on a cheerfulness/emoji review - fetches the PR diff, asks a language model for a verdict, and posts it back as a comment"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct Cli {
    /// How the model's answer is requested and parsed
    #[arg(long, value_enum, default_value = "free-text")]
    mode: ReviewMode,

    /// Model identifier to request the review from
    #[arg(long, default_value = "gpt-4o")]
    model: String,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    };

    let backend = OpenAiClient::new(config.openai_api_key.clone(), cli.model.clone());
    let sink = GitHubApi::new(
        config.github_token.clone(),
        config.repo_name.clone(),
        config.pr_number,
        cli.mode,
    );

    match run_review(&config, cli.mode, &GitCli, &backend, &sink).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}
