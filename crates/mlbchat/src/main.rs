//! Command line front end of the trade analyses.

#[macro_use]
extern crate tracing;

mod logging;

use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mlbchat::config::Settings;
use mlbchat::core::tool::ToolSource;
use mlbchat::core::{Canceller, cancellation};
use mlbchat::{Analyst, McpToolSource};
use mlbchat_anthropic_model::{AnthropicConfig, AnthropicProvider};
use mlbchat_mcp::McpConfig;
use owo_colors::OwoColorize;
use tokio::task::JoinSet;

type BoxError = Box<dyn Error + Send + Sync>;

const USAGE_ERROR: u8 = 2;
const BAR_CHAR: &str = "▎";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// Ask the model a question, to check the credentials.
    Test,
    /// Analyze the trade options of the given teams.
    Trades,
    /// List the tools of the MCP server.
    Testmcp,
}

#[derive(Debug, Parser)]
#[command(name = "mlbchat", version, about)]
struct Args {
    /// What do you want MLB chat to do?
    #[arg(long, value_enum)]
    operation: Option<Operation>,

    /// A JSON file with settings, credentials, etc.
    #[arg(long)]
    config: Option<PathBuf>,

    /// A Major League Baseball team, for example: Washington Nationals.
    /// Repeat to analyze several teams at once.
    #[arg(long = "team", value_name = "TEAM")]
    teams: Vec<String>,

    /// How many times to retry a run after a transient model failure.
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logging::init() {
        eprintln!("failed to set up logging: {err}");
        return ExitCode::FAILURE;
    }

    let Some(operation) = args.operation else {
        error!("MLB chat needs to know what to do.");
        Args::command().print_help().ok();
        return ExitCode::from(USAGE_ERROR);
    };

    let settings = match &args.config {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(err) => return usage_error(err),
        },
        None => Settings::default(),
    };

    let result = match operation {
        Operation::Test => match settings.anthropic_config() {
            Ok(config) => test(config).await,
            Err(err) => return usage_error(err),
        },
        Operation::Trades => {
            if args.teams.is_empty() {
                return usage_error("Trade analysis needs at least one team.");
            }
            let config = match settings.anthropic_config() {
                Ok(config) => config,
                Err(err) => return usage_error(err),
            };
            let tools = match settings.mcp_config() {
                Ok(config) => Some(config),
                Err(err) => {
                    warn!("{err}, analyzing without tools");
                    None
                }
            };
            trades(config, tools, &args).await
        }
        Operation::Testmcp => match settings.mcp_config() {
            Ok(config) => test_mcp(config).await,
            Err(err) => return usage_error(err),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn usage_error(err: impl Display) -> ExitCode {
    error!("{err}");
    ExitCode::from(USAGE_ERROR)
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

async fn test(config: AnthropicConfig) -> Result<(), BoxError> {
    let analyst = Analyst::new(AnthropicProvider::new(config));

    let spinner = spinner("🤔 Thinking...");
    let answer = analyst.motivational_answer().await;
    spinner.finish_and_clear();

    info!("{}", answer?);
    Ok(())
}

async fn test_mcp(config: McpConfig) -> Result<(), BoxError> {
    let source = McpToolSource::new(config);

    let spinner = spinner("🔌 Listing tools...");
    let catalog = source.fetch_catalog().await;
    spinner.finish_and_clear();

    let catalog = catalog?;
    let names: Vec<_> = catalog.iter().map(|tool| tool.name.as_str()).collect();
    info!("Tools: {names:?}");
    for tool in &catalog {
        debug!("{}: {} {}", tool.name, tool.description, tool.input_schema);
    }
    Ok(())
}

async fn trades(
    config: AnthropicConfig,
    tools: Option<McpConfig>,
    args: &Args,
) -> Result<(), BoxError> {
    let (canceller, signal) = cancellation();
    tokio::spawn(cancel_on_ctrl_c(canceller));

    let mut analyst = Analyst::new(AnthropicProvider::new(config))
        .with_retries(args.retries)
        .with_cancel_signal(signal);
    if let Some(tools) = tools {
        analyst = analyst.with_tool_source(Arc::new(McpToolSource::new(tools)));
    }

    let mut runs = JoinSet::new();
    for team in &args.teams {
        let analyst = analyst.clone();
        let team = team.clone();
        runs.spawn(async move {
            let result = analyze(&analyst, &team).await;
            (team, result)
        });
    }

    let total = args.teams.len();
    let mut failures = 0;
    while let Some(joined) = runs.join_next().await {
        match joined {
            Ok((team, Ok(()))) => {
                println!("{}✅ {}", BAR_CHAR.bright_green(), team.bold());
            }
            Ok((team, Err(err))) => {
                error!(team, "analysis failed: {err}");
                println!("{}❌ {}", BAR_CHAR.bright_red(), team.bold());
                failures += 1;
            }
            Err(err) => {
                error!("analysis task failed: {err}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {total} analyses failed").into());
    }
    Ok(())
}

async fn analyze(
    analyst: &Analyst<AnthropicProvider>,
    team: &str,
) -> Result<(), BoxError> {
    info!(team, "================ Simpleton ==================");
    info!(team, "{}", analyst.simpleton_trade(team).await?);
    info!(team, "================ Role-based ==================");
    info!(team, "{}", analyst.role_based_trade(team).await?);
    info!(team, "================ Tool-use ==================");
    let transcript = analyst.tools_trade(team).await?;
    info!(team, "{}", serde_json::to_string_pretty(&transcript)?);
    Ok(())
}

async fn cancel_on_ctrl_c(canceller: Canceller) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupted, cancelling the analyses");
        canceller.cancel();
    }
}
