use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_worker::worker::poll::wait_until_available;
use comfy_worker::worker::retry::Outcome;
use comfy_worker::{Config, Job, Worker};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "workerctl", about = "CLI for the ComfyUI worker", version)]
struct Cli {
    /// Override COMFY_HOST (host:port)
    #[arg(global = true, long)]
    comfy_host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single job from a JSON file and print the response
    Run {
        /// Job file: either {"input": ...} or {"id": ..., "input": ...}
        #[arg(long, value_name = "PATH", default_value = "test_input.json")]
        input: PathBuf,
        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
    /// Check whether the ComfyUI API is reachable
    Probe,
    /// Fetch the history record of a prompt
    History {
        prompt_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(host) = cli.comfy_host {
        conf.comfy_host = host;
    }

    match cli.command {
        Commands::Run { input, pretty } => {
            let data = tokio::fs::read_to_string(&input).await?;
            let raw: Value = serde_json::from_str(&data)?;
            let job = Job {
                id: raw.get("id").and_then(|v| v.as_str()).unwrap_or("local_test").to_string(),
                input: raw.get("input").cloned().unwrap_or(Value::Null),
            };

            let worker = Worker::new(conf)?;
            let response = worker.handle(&job).await;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", serde_json::to_string(&response)?);
            }
            if !response.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Probe => {
            let worker = Worker::new(conf.clone())?;
            match wait_until_available(worker.client(), conf.availability).await {
                Outcome::Ready(()) => {
                    println!("ComfyUI at {} is reachable", worker.client().base_url());
                    Ok(())
                }
                _ => {
                    eprintln!("ComfyUI at {} is not reachable", worker.client().base_url());
                    std::process::exit(1);
                }
            }
        }
        Commands::History { prompt_id } => {
            let worker = Worker::new(conf)?;
            let history = worker.client().get_history_raw(&prompt_id).await.map_err(|e| {
                eprintln!("Error: {}", e);
                e
            })?;
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(())
        }
    }
}
