//! Server binary for bill-gateway.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GatewayConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use bill_gateway::{serve, Gateway, GatewayConfig, PromptRevision};
use clap::Parser;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Local development (Gemini, default origins)
  GEMINI_API_KEY=... bill-gateway

  # Production origin only, on port 8080
  bill-gateway --port 8080 --allowed-origin https://www.satyajeetnigade.in

  # Ask the model for discounts as negative line items
  bill-gateway --prompt-revision discount-line

  # Call the gateway
  curl -X POST http://localhost:8787/ \
    -H 'Origin: http://localhost:3000' \
    -H 'Content-Type: application/json' \
    -d "{\"image\":{\"base64Data\":\"$(base64 -w0 bill.jpg)\",\"mimeType\":\"image/jpeg\"}}"

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY               Google Gemini API key (default provider)
  OPENAI_API_KEY               OpenAI API key (--provider openai)
  ANTHROPIC_API_KEY            Anthropic API key (--provider anthropic)
  BILL_GATEWAY_ALLOWED_ORIGINS Comma-separated allow-list
  RUST_LOG                     tracing filter, overrides --verbose
"#;

/// Extract structured JSON from restaurant bill photos using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "bill-gateway",
    version,
    about = "HTTP gateway that extracts structured JSON from restaurant bill photos",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "BILL_GATEWAY_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8787)]
    port: u16,

    /// Allowed origin (substring match); repeat or comma-separate for several.
    #[arg(
        long = "allowed-origin",
        env = "BILL_GATEWAY_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    allowed_origins: Vec<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = "gemini")]
    provider: String,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = "gemini-2.0-flash")]
    model: String,

    /// How the model should represent discounts.
    #[arg(long, env = "BILL_GATEWAY_PROMPT_REVISION", value_enum, default_value = "discount-field")]
    prompt_revision: RevisionArg,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "BILL_GATEWAY_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BILL_GATEWAY_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "BILL_GATEWAY_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "BILL_GATEWAY_MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_body_bytes: usize,

    /// Do not log a warning when extracted totals fail to reconcile.
    #[arg(long, env = "BILL_GATEWAY_NO_VERIFY_TOTALS")]
    no_verify_totals: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BILL_GATEWAY_VERBOSE")]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "BILL_GATEWAY_JSON_LOGS")]
    json_logs: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RevisionArg {
    DiscountLine,
    DiscountField,
    PreApplied,
}

impl From<RevisionArg> for PromptRevision {
    fn from(v: RevisionArg) -> Self {
        match v {
            RevisionArg::DiscountLine => PromptRevision::DiscountLine,
            RevisionArg::DiscountField => PromptRevision::DiscountField,
            RevisionArg::PreApplied => PromptRevision::PreApplied,
        }
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "bill_gateway=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut builder = GatewayConfig::builder()
        .provider_name(&cli.provider)
        .model(&cli.model)
        .prompt_revision(cli.prompt_revision.clone().into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_body_bytes(cli.max_body_bytes)
        .verify_totals(!cli.no_verify_totals);

    if !cli.allowed_origins.is_empty() {
        builder = builder.allowed_origins(cli.allowed_origins.iter().cloned());
    }

    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("reading system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }

    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let config = build_config(&cli)?;
    info!(
        "Using {} / {} with {:?} prompt",
        config.provider_name, config.model, config.prompt_revision
    );

    let gateway = Gateway::from_config(config).context("initialising model provider")?;
    let addr = SocketAddr::new(cli.host, cli.port);
    serve(addr, Arc::new(gateway)).await?;
    Ok(())
}
