//! Hearth server CLI
//!
//! Starts the HTTP server for the neighborhood connection graph.

use hearth_server::{config::ServerConfig, start_server, ServerError};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using default development configuration");
        eprintln!("Usage: hearth-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::default_test_config()
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Hearth Server - Neighborhood Connections and Recommendations");
    println!();
    println!("USAGE:");
    println!("    hearth-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG           Log filter (default: info)");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file should contain:");
    println!("    - bind_address: IP address to bind (e.g., '127.0.0.1')");
    println!("    - bind_port: Port number (e.g., 8080)");
    println!("    - jwt_secret: Secret key for JWT token signing");
    println!("    - token_expiry_secs: Token expiry in seconds (default: 3600)");
    println!("    - database_path: SQLite file (default: ':memory:')");
    println!("    - [engine]: limits, page sizes, candidate_pool_cap, rerequest_cooldown_secs");
    println!("    - [[residents]]: id, display_name, neighborhood, district, interests");
    println!();
}
