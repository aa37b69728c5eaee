// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dynsoap console
//!
//! Discover a SOAP service and call its operations from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Interactive: prompts for address, endpoint, operation and every value
//! dynsoap-console
//!
//! # List what a service exposes
//! dynsoap-console --url http://localhost:8095/test list
//!
//! # Show the input fields of an operation
//! dynsoap-console --url http://localhost:8095/test --endpoint ServiceName1 \
//!     --operation ComplexObject params
//!
//! # Call without prompting
//! dynsoap-console --url http://localhost:8095/test --endpoint ServiceName1 \
//!     --operation ComplexObject call --arg s=hello --arg c.I=3 --arg c.J=1.5
//! ```

use clap::{Parser, Subcommand};
use dynsoap::{
    default_sink, Config, Explorer, FieldValues, Session, StartupArgs, TokenRequest, TokenSource,
    ValueNode,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Dynamic SOAP console
#[derive(Parser, Debug)]
#[command(name = "dynsoap-console")]
#[command(about = "Discover a SOAP service and call its operations without generated bindings")]
#[command(version)]
struct Args {
    /// Service address (prompted for when missing)
    #[arg(short, long)]
    url: Option<String>,

    /// Endpoint (port) name
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Operation name
    #[arg(short, long)]
    operation: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List endpoints and their operations
    List,

    /// Show the input fields of an operation
    Params,

    /// Call an operation with values given as path=value
    Call {
        /// Field value (format: "path=value", can repeat)
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Initialize logging
    let level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let explorer = Explorer::http(&config, default_sink())?;

    match args.command {
        Some(Commands::List) => {
            let address = required(args.url, "--url")?;
            cmd_list(&explorer, &address).await
        }
        Some(Commands::Params) => {
            let session = start(&explorer, args.url, args.endpoint, args.operation).await?;
            print_parameters(&session);
            Ok(())
        }
        Some(Commands::Call { args: values }) => {
            let session = start(&explorer, args.url, args.endpoint, args.operation).await?;
            let values = parse_values(&values)?;
            let output = session.invoke(&explorer, &values).await?;
            print_output(&session, &output);
            Ok(())
        }
        None => interactive(&explorer, args.url, args.endpoint, args.operation).await,
    }
}

fn required(value: Option<String>, flag: &str) -> Result<String, Box<dyn std::error::Error>> {
    value.ok_or_else(|| format!("Missing {}", flag).into())
}

async fn start(
    explorer: &Explorer,
    url: Option<String>,
    endpoint: Option<String>,
    operation: Option<String>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let startup = StartupArgs {
        address: Some(required(url, "--url")?),
        service_name: endpoint,
        method: Some(required(operation, "--operation")?),
    };
    let mut session = Session::new();
    session.initialize(explorer, startup).await?;
    Ok(session)
}

fn parse_values(pairs: &[String]) -> Result<FieldValues, Box<dyn std::error::Error>> {
    let mut values = FieldValues::new();
    for pair in pairs {
        let (path, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid argument '{}' (expected path=value)", pair))?;
        values.set(path.trim(), value);
    }
    Ok(values)
}

async fn cmd_list(explorer: &Explorer, address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let endpoints = explorer.list_endpoints(address).await?;
    println!("Services:");
    for endpoint in &endpoints {
        println!(" - {} ({})", endpoint.name, endpoint.address);
        for op in &endpoint.operations {
            println!("    - {}", op.signature());
        }
    }
    Ok(())
}

fn print_parameters(session: &Session) {
    if session.parameters().is_empty() {
        println!("(no parameters)");
    }
    for field in session.parameters() {
        println!("{} ({})", field.path, field.type_name);
    }
}

/// Reads prompted lines from stdin. `None` once input is closed.
struct Console {
    lines: io::Lines<io::StdinLock<'static>>,
}

impl Console {
    fn new() -> Self {
        Self {
            lines: io::stdin().lock().lines(),
        }
    }

    fn prompt(&mut self, text: &str) -> Option<String> {
        print!("{}", text);
        io::stdout().flush().ok()?;
        match self.lines.next()? {
            Ok(line) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                None
            }
        }
    }
}

impl TokenSource for Console {
    fn next_token(&mut self, request: &TokenRequest<'_>) -> Option<String> {
        if request.is_count() {
            self.prompt("Enter an array length: ")
        } else {
            self.prompt(&format!(
                "Enter a value for {} ({}): ",
                request.path,
                request.type_name()
            ))
        }
    }
}

fn default_address() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("http://{}:8095/test", host)
}

/// Prompt for an address, an endpoint and an operation, then call it.
/// Errors are reported and the loop starts over; closing stdin ends it.
async fn interactive(
    explorer: &Explorer,
    mut url: Option<String>,
    mut endpoint: Option<String>,
    mut operation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut console = Console::new();
    loop {
        let address = match url.take() {
            Some(address) => address,
            None => match console.prompt("Enter a web service url: ") {
                Some(line) if line.trim().is_empty() => default_address(),
                Some(line) => line.trim().to_string(),
                None => return Ok(()),
            },
        };

        match round(explorer, &mut console, address, endpoint.take(), operation.take()).await {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => println!("Error: {}", e),
        }
        println!();
    }
}

/// One pass of the interactive loop. `Ok(false)` means input ran out.
async fn round(
    explorer: &Explorer,
    console: &mut Console,
    address: String,
    endpoint: Option<String>,
    operation: Option<String>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut session = Session::new();
    session.set_address(address);
    session.resolve(explorer).await?;

    println!("Services:");
    for name in session.endpoints() {
        println!(" - {}", name);
        for op in session.endpoint(name).into_iter().flat_map(|e| e.operation_names()) {
            println!("    - {}", op);
        }
    }

    // A lone endpoint is already selected.
    let endpoint = match endpoint {
        Some(name) => Some(name),
        None if session.selected_endpoint().is_some() => None,
        None => match console.prompt("Select service name: ") {
            Some(line) => Some(line.trim().to_string()),
            None => return Ok(false),
        },
    };
    if let Some(name) = endpoint {
        session.select_endpoint(&name)?;
    }

    println!("Methods:");
    for name in session.operations() {
        println!(" - {}", name);
    }
    let name = match operation {
        Some(name) => name,
        None => match console.prompt("Enter method: ") {
            Some(line) => line.trim().to_string(),
            None => return Ok(false),
        },
    };
    session.select_operation(&name)?;

    let output = session.invoke_with(explorer, console).await?;
    print_output(&session, &output);
    Ok(true)
}

/// Operations without a result print nothing.
fn print_output(session: &Session, output: &ValueNode) {
    if session.returns_value() {
        println!("Output: {}", output);
    }
}
