// Validate one parcel from a JSON request file
//
// Usage: cargo run --features cli --bin validate_parcel -- request.json [--config engine.json]
//
// The file holds one validation request (or an array of them). Reports are
// printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use parcel_validator::{EngineConfig, ValidationEngine, ValidationRequest};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "validate_parcel", about = "Validate parcel claims from a JSON request file")]
struct Args {
    /// Request JSON file: one request object or an array of them
    request: PathBuf,

    /// Engine config JSON (defaults to $PARCEL_CONFIG, then built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel_validator=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = args
        .config
        .or_else(|| std::env::var("PARCEL_CONFIG").ok().map(PathBuf::from));
    let config = EngineConfig::load(config_path.as_deref())?;
    let engine = ValidationEngine::from_config(config)?;

    let contents = std::fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request file: {:?}", args.request))?;
    let input: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse request JSON: {:?}", args.request))?;

    let output = if input.is_array() {
        let requests: Vec<ValidationRequest> =
            serde_json::from_value(input).context("Invalid validation request array")?;
        serde_json::to_string_pretty(&engine.validate_batch(&requests))?
    } else {
        let request: ValidationRequest =
            serde_json::from_value(input).context("Invalid validation request")?;
        serde_json::to_string_pretty(&engine.validate(&request))?
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_request_path_is_required() {
        assert!(Args::try_parse_from(["validate_parcel"]).is_err());
        assert!(Args::try_parse_from(["validate_parcel", "a.json", "b.json"]).is_err());

        let args = Args::try_parse_from(["validate_parcel", "req.json", "-c", "engine.json"]).unwrap();
        assert_eq!(args.request, PathBuf::from("req.json"));
        assert_eq!(args.config, Some(PathBuf::from("engine.json")));
    }
}
