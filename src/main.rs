use anyhow::Result;
use clap::{Parser, Subcommand};

use benefits_flow::config::Config;
use benefits_flow::flow::{FlowKind, FlowVariant};
use benefits_flow::{logging, rest};

#[derive(Parser)]
#[command(name = "benefits-flow")]
#[command(about = "Multi-step apply and renew wizard for dental benefits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the wizard HTTP server (default)
    Serve {
        /// Port to listen on (default: 7010)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List flow kinds, variants and their steps
    Flows {
        /// Show the fields each variant requires before review
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Print the OpenAPI document as JSON
    Openapi,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let _logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            cmd_serve(config, port).await?;
        }
        Some(Commands::Flows { verbose }) => {
            cmd_flows(&config, verbose);
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
        }
        Some(Commands::Openapi) => {
            println!("{}", rest::ApiDoc::json()?);
        }
        None => {
            cmd_serve(config, None).await?;
        }
    }

    Ok(())
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.bind_address();

    println!("Starting benefits flow server...");
    println!("  Address: http://{}", addr);
    println!("  Flows:   {}", enabled_list(&config));
    println!("  Docs:    http://{}/swagger-ui", addr);
    println!();

    let state = rest::ApiState::new(config)?;
    rest::serve(state, &addr).await?;

    Ok(())
}

fn enabled_list(config: &Config) -> String {
    let kinds: Vec<&str> = config
        .enabled_flows()
        .iter()
        .map(FlowKind::slug)
        .collect();
    if kinds.is_empty() {
        "(none)".to_string()
    } else {
        kinds.join(", ")
    }
}

fn cmd_flows(config: &Config, verbose: bool) {
    for kind in FlowKind::all() {
        let status = if config.is_enabled(*kind) {
            "enabled"
        } else {
            "disabled"
        };
        println!("{} ({})", kind.slug(), status);
        println!("{}", "─".repeat(60));

        for variant in FlowVariant::all(*kind) {
            let steps: Vec<&str> = variant.steps.iter().map(|step| step.slug()).collect();
            println!("  {}", variant.slug());
            println!("    {}", steps.join(" → "));

            if verbose {
                let fields: Vec<&str> = variant
                    .requirements
                    .iter()
                    .map(|requirement| requirement.field.key())
                    .collect();
                println!("    requires: {}", fields.join(", "));
            }
        }
        println!();
    }
}
