//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use contextual_classification::{ClassificationClient, HttpClient, decode};
use contextual_core::{ContextualModule, ModuleInvocationContext, ProcessedAuctionRequestPayload};
use contextual_shared::{
    AccountConfig, AppConfig, BidRequest, GlobalConfig, ResponseFraming, init_config, load_config,
    load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contextual — enrich bid requests with page classification data.
#[derive(Parser)]
#[command(
    name = "contextual",
    version,
    about = "Enrich OpenRTB bid requests with contextual page classification.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.contextual/contextual.toml.
    #[arg(long, global = true, env = "CONTEXTUAL_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich a bid request and print the result.
    Enrich {
        /// Bid request JSON file, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        request: String,

        /// Print only the change set instead of the enriched request.
        #[arg(long)]
        mutation_only: bool,

        #[command(flatten)]
        classification: ClassificationArgs,
    },

    /// Fetch and print the classification of one page.
    Classify {
        /// Page URL to classify.
        #[arg(long)]
        page: String,

        #[command(flatten)]
        classification: ClassificationArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags overriding the `[classification]` and `[account]` config sections.
#[derive(Args, Debug, Default)]
pub(crate) struct ClassificationArgs {
    /// Classification silo of the account.
    #[arg(long)]
    pub silo: Option<String>,

    /// Endpoint template, `{{.SILO}}` is replaced by the silo.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Response framing.
    #[arg(long)]
    pub framing: Option<FramingArg>,

    /// JSONP callback name to require (with `--framing jsonp`).
    #[arg(long)]
    pub callback: Option<String>,

    /// Leading bytes to strip (with `--framing fixed`).
    #[arg(long, default_value_t = 0)]
    pub prefix: usize,

    /// Trailing bytes to strip (with `--framing fixed`).
    #[arg(long, default_value_t = 0)]
    pub suffix: usize,

    /// Fetch deadline in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// `--framing` values.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FramingArg {
    Plain,
    Jsonp,
    Fixed,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout is JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contextual=warn",
        1 => "contextual=info",
        2 => "contextual=debug",
        _ => "contextual=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            request,
            mutation_only,
            classification,
        } => cmd_enrich(cli.config_file, &request, mutation_only, &classification).await,
        Command::Classify {
            page,
            classification,
        } => cmd_classify(cli.config_file, &page, &classification).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config_file),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    config_path: Option<PathBuf>,
    request: &str,
    mutation_only: bool,
    args: &ClassificationArgs,
) -> Result<()> {
    let app = app_config(config_path)?;
    let global = resolve_global(&app, args)?;
    let silo = resolve_silo(&app, args);

    let bid_request: BidRequest = serde_json::from_str(&read_request(request)?)
        .wrap_err("bid request is not valid OpenRTB JSON")?;
    let mut payload = ProcessedAuctionRequestPayload { bid_request };

    let module = ContextualModule::from_config(global)?;
    let account_blob = serde_json::json!({ "silo": silo }).to_string();
    let ctx = ModuleInvocationContext::with_account_config(account_blob);

    info!(request_id = %payload.bid_request.id, "enriching bid request");
    let result = module.handle_processed_auction_hook(&ctx, &payload).await?;

    if mutation_only {
        println!("{}", serde_json::to_string_pretty(&result.change_set)?);
        return Ok(());
    }

    result.change_set.apply(&mut payload);
    println!("{}", serde_json::to_string_pretty(&payload.bid_request)?);
    Ok(())
}

async fn cmd_classify(config_path: Option<PathBuf>, page: &str, args: &ClassificationArgs) -> Result<()> {
    let app = app_config(config_path)?;
    let global = resolve_global(&app, args)?;
    let account = AccountConfig {
        silo: resolve_silo(&app, args),
    };
    account.validate()?;

    let client = HttpClient::new(&global)?;
    let response = client.fetch(&account.silo, page).await?;
    let record = decode(response, &global.framing).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn app_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// File config with CLI flag overrides applied.
fn resolve_global(app: &AppConfig, args: &ClassificationArgs) -> Result<GlobalConfig> {
    let mut global = app.classification.clone();

    if let Some(endpoint) = &args.endpoint {
        global.endpoint = endpoint.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        global.timeout_ms = timeout_ms;
    }
    if let Some(framing) = args.framing {
        global.framing = match framing {
            FramingArg::Plain => ResponseFraming::Plain,
            FramingArg::Jsonp => ResponseFraming::Jsonp {
                callback: args.callback.clone(),
            },
            FramingArg::Fixed => ResponseFraming::Fixed {
                prefix: args.prefix,
                suffix: args.suffix,
            },
        };
    }

    Ok(global.normalized()?)
}

/// `--silo`, else `[account] silo`, else empty (rejected by account validation).
fn resolve_silo(app: &AppConfig, args: &ClassificationArgs) -> String {
    args.silo
        .clone()
        .or_else(|| app.account.silo.clone())
        .unwrap_or_default()
}

fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("failed to read bid request from stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(source).map_err(|e| eyre!("failed to read bid request '{source}': {e}"))
}
