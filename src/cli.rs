//! CLI module
//!
//! This module provides the command-line interface functionality for the taskrank tool.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::{ColoredString, Colorize};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::net::IpAddr;

use crate::{
    api::{serve, Client, ClientConfig, CoreClient, HttpClientImpl, ServerConfig},
    models::{ScoredTask, Strategy, Suggestion, Weights, WeightsError},
    Core,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(
        short,
        long,
        env = "TASKRANK_SERVER",
        default_value = "http://localhost:3000"
    )]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the taskrank API server
    Serve {
        /// Address to bind
        #[arg(long, env = "TASKRANK_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        /// Port to listen on
        #[arg(short, long, env = "TASKRANK_PORT", default_value_t = 3000)]
        port: u16,

        /// Largest batch a single request may submit
        #[arg(long, env = "TASKRANK_MAX_TASKS", default_value_t = 500)]
        max_tasks: usize,

        #[command(flatten)]
        weights: WeightArgs,
    },

    /// Rank every task in a JSON file
    Analyze {
        /// JSON array of tasks, or an object with a "tasks" list ("-" reads stdin)
        file: String,

        #[command(flatten)]
        weights: WeightArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the three tasks to work on next
    Suggest {
        /// JSON array of tasks, or an object with a "tasks" list ("-" reads stdin)
        file: String,

        /// Ranking strategy: smart, fastest, high_impact or deadline
        #[arg(long, default_value = "smart")]
        strategy: Strategy,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Weight overrides; any weight left out keeps its default
#[derive(Args, Debug, Default)]
struct WeightArgs {
    /// Weight of the due-date factor
    #[arg(long = "urgency-weight", env = "TASKRANK_URGENCY_WEIGHT")]
    urgency: Option<f64>,

    /// Weight of the importance factor
    #[arg(long = "importance-weight", env = "TASKRANK_IMPORTANCE_WEIGHT")]
    importance: Option<f64>,

    /// Weight of the quick-win factor
    #[arg(long = "effort-weight", env = "TASKRANK_EFFORT_WEIGHT")]
    effort: Option<f64>,

    /// Weight of the blocked-tasks factor
    #[arg(long = "dependency-weight", env = "TASKRANK_DEPENDENCY_WEIGHT")]
    dependency: Option<f64>,
}

impl WeightArgs {
    /// `None` when no weight was given at all
    fn overrides(&self) -> Result<Option<Weights>, WeightsError> {
        if self.urgency.is_none()
            && self.importance.is_none()
            && self.effort.is_none()
            && self.dependency.is_none()
        {
            return Ok(None);
        }

        let defaults = Weights::default();
        Weights::new(
            self.urgency.unwrap_or(defaults.urgency),
            self.importance.unwrap_or(defaults.importance),
            self.effort.unwrap_or(defaults.effort),
            self.dependency.unwrap_or(defaults.dependency),
        )
        .map(Some)
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Score in-process instead of calling the server
    #[arg(long)]
    local: bool,

    /// Print the raw JSON result
    #[arg(long)]
    json: bool,
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            host,
            port,
            max_tasks,
            weights,
        } => {
            let weights = weights.overrides()?.unwrap_or_default();
            println!("Starting taskrank API server on {}:{}...", host, port);

            let core = Core::new(weights)?;
            let config = ServerConfig {
                address: (*host, *port).into(),
                max_tasks: *max_tasks,
            };

            // Start the API server
            serve(core, config).await?;
            Ok(())
        }

        Commands::Analyze {
            file,
            weights,
            output,
        } => {
            let tasks = read_tasks(file)?;
            let client = create_client(&cli.server, output.local);

            let ranked = client.analyze(tasks, weights.overrides()?).await?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&ranked)?);
            } else {
                print_ranking(&ranked);
            }
            Ok(())
        }

        Commands::Suggest {
            file,
            strategy,
            output,
        } => {
            let tasks = read_tasks(file)?;
            let client = create_client(&cli.server, output.local);

            let suggestions = client.suggest(tasks, *strategy).await?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
            } else {
                print_suggestions(&suggestions, *strategy);
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            // Generate completions for the specified shell
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(server_url: &str, local: bool) -> Box<dyn Client> {
    if local {
        return Box::new(CoreClient::new(Core::default()));
    }

    let config = ClientConfig {
        base_url: server_url.to_string(),
    };
    Box::new(HttpClientImpl::with_config(config))
}

fn read_tasks(path: &str) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let contents = if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path)?
    };

    Ok(parse_task_file(&contents)?)
}

/// Accepts either a bare JSON array or the analyze request shape
fn parse_task_file(contents: &str) -> Result<Vec<Value>, String> {
    let value: Value = serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {}", e))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut body) => match body.remove("tasks") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err("expected an object with a 'tasks' list".to_string()),
        },
        _ => Err("expected a JSON array of tasks".to_string()),
    }
}

fn score_label(score: f64) -> ColoredString {
    let text = format!("[{:>7.4}]", score);
    if score >= 6.0 {
        text.red().bold()
    } else if score >= 3.0 {
        text.yellow()
    } else {
        text.green()
    }
}

fn print_ranking(ranked: &[ScoredTask]) {
    if ranked.is_empty() {
        println!("No tasks to rank.");
        return;
    }

    for (i, scored) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {} {} {}",
            i + 1,
            score_label(scored.score),
            scored.task.title.bold(),
            format!("(id: {})", scored.task.id).dimmed()
        );
        for line in &scored.explanation {
            println!("       {}", line);
        }
    }
}

fn print_suggestions(suggestions: &[Suggestion], strategy: Strategy) {
    println!("Suggested next tasks ({} strategy):", strategy.to_string().cyan());

    if suggestions.is_empty() {
        println!("  Nothing to suggest.");
        return;
    }

    for (i, suggestion) in suggestions.iter().enumerate() {
        println!(
            "{:>3}. {} {} {}",
            i + 1,
            score_label(suggestion.score),
            suggestion.title.bold(),
            format!("(id: {})", suggestion.id).dimmed()
        );
        println!("       {}", suggestion.reason_summary);
    }
}
