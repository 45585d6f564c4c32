//! CLI entry point for the corax graph-database client.

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::{fmt, EnvFilter};

use corax_client::{ClientConfig, CliOutput, CoraxClient};

#[derive(Parser)]
#[command(name = "corax")]
#[command(about = "Client for a coraxcore graph database")]
struct Cli {
    /// Core URL (overrides config).
    #[arg(short, long)]
    url: Option<String>,

    /// Pre-shared key (overrides config).
    #[arg(long)]
    psk: Option<String>,

    /// Graph to operate on.
    #[arg(short, long, default_value = "corax")]
    graph: String,

    /// Config file prefix (default: corax).
    #[arg(short, long, default_value = "corax")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the core is reachable.
    Ping,
    /// Execute a CLI command on the core.
    Exec {
        /// The command line, e.g. "search is(instance) | count".
        command: String,
    },
    /// Run a search and print matching nodes as NDJSON.
    Search {
        /// The search query, e.g. "is(instance)".
        query: String,
    },
    /// Run a graph search and print it as Graphviz DOT.
    ExportDot {
        /// The search query selecting the subgraph.
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(&cli.config)?;
    if let Some(url) = &cli.url {
        config.core_url = url.clone();
    }
    if let Some(psk) = &cli.psk {
        config.psk = Some(psk.clone());
    }

    let client = CoraxClient::connect(&config).await?;
    let result = run(&cli, &client).await;
    client.shutdown();
    result
}

async fn run(cli: &Cli, client: &CoraxClient) -> anyhow::Result<()> {
    match &cli.command {
        Command::Ping => {
            let reply = client.ping().await?;
            println!("{}", reply.trim());
        }
        Command::Exec { command } => match client.cli_execute(&cli.graph, command, None).await? {
            CliOutput::Text(text) => println!("{text}"),
            CliOutput::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            CliOutput::Stream(mut stream) => {
                while let Some(item) = stream.next().await {
                    println!("{}", item?);
                }
            }
        },
        Command::Search { query } => {
            let mut stream = client.search_list(&cli.graph, query, None).await?;
            while let Some(item) = stream.next().await {
                println!("{}", item?);
            }
        }
        Command::ExportDot { query } => {
            let dot = client.export_graphviz(&cli.graph, query).await?;
            print!("{dot}");
        }
    }
    Ok(())
}
