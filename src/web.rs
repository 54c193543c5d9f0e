#![cfg(not(tarpaulin_include))]

use docfill::app;
use std::env;

/// Main entry point for the web application
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Default listen address, overridable as the first argument
    let addr = if args.len() >= 2 {
        args[1].clone()
    } else {
        "127.0.0.1:3000".to_string()
    };

    app::run(&addr).await?;

    Ok(())
}
