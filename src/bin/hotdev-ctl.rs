use clap::{Parser, Subcommand};
use serde_json::Value;
use url::Url;

use hotdev::rpc::{CallerError, RpcCaller};

#[derive(Parser)]
#[command(name = "hotdev-ctl")]
#[command(about = "Inspect and call a running hotdev server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:5544")]
    url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listener generation, route and service counts
    Status,
    /// Routes mounted on the current listener
    Routes,
    /// Invoke an RPC method
    Call {
        feature: String,
        method: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(cli.url.join("/__dev/status")?).send().await?;
            print_response(res).await?;
        }
        Commands::Routes => {
            let res = client.get(cli.url.join("/__dev/routes")?).send().await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: server returned status {}", status);
                return Ok(());
            }
            let routes: Vec<Value> = res.json().await?;
            for route in routes {
                println!(
                    "{:<6} {:<30} {}.{}",
                    route["method"].as_str().unwrap_or("?"),
                    route["path"].as_str().unwrap_or("?"),
                    route["handler"]["feature"].as_str().unwrap_or("?"),
                    route["handler"]["action"].as_str().unwrap_or("?"),
                );
            }
        }
        Commands::Call {
            feature,
            method,
            body,
        } => {
            let body = body.map(|text| serde_json::from_str::<Value>(&text)).transpose()?;
            let caller = RpcCaller::new(cli.url);
            match caller.call_method(&feature, &method, body).await {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(CallerError::Status { status, body }) => {
                    eprintln!("Error: server returned status {}", status);
                    eprintln!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
