use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Inspect a running edge function registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8970")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show build state, loaded functions and the last build error
    Status,
    /// List installed routes and the manifest
    Routes,
    /// Show which edge functions run for a request
    Match {
        /// Request path, e.g. /api/users
        path: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/__edge/status", cli.url)).send().await?,
        Commands::Routes => client.get(format!("{}/__edge/routes", cli.url)).send().await?,
        Commands::Match { path, method } => {
            client
                .get(format!("{}/__edge/match", cli.url))
                .query(&[("path", path), ("method", method)])
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Inspector API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
