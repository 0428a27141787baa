//! HEYI CLI
//!
//! Scans a web page for AI-generated content by blending a text signal and an
//! image signal into one confidence score.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use heyi_core::{FileResultStore, SharedStore};
use heyi_net::{domain_of, EndpointConfig, FlagLookup};
use heyi_runtime::{ControllerConfig, OrchestrationController, Settled};

#[derive(Parser)]
#[command(name = "heyi")]
#[command(author, version, about = "HEYI: is this page AI-generated?", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    endpoints: EndpointArgs,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

#[derive(Args)]
struct EndpointArgs {
    /// TOML file with endpoint settings
    #[arg(long, env = "HEYI_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Text classifier job endpoint
    #[arg(long, env = "HEYI_TEXT_ENDPOINT", global = true)]
    text_endpoint: Option<String>,

    /// Image classifier endpoint
    #[arg(long, env = "HEYI_IMAGE_ENDPOINT", global = true)]
    image_endpoint: Option<String>,

    /// Scan ledger base URL
    #[arg(long, env = "HEYI_LEDGER_URL", global = true)]
    ledger_url: Option<String>,

    /// Seconds to wait for the text result stream
    #[arg(long, env = "HEYI_STREAM_TIMEOUT", global = true)]
    stream_timeout: Option<u64>,

    /// Directory holding stored results (default: ~/.heyi/results)
    #[arg(long, env = "HEYI_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,
}

impl EndpointArgs {
    fn endpoint_config(&self) -> Result<EndpointConfig> {
        let mut config = match &self.config {
            Some(path) => EndpointConfig::from_toml_file(path)?,
            None => EndpointConfig::default(),
        };

        if let Some(url) = &self.text_endpoint {
            config.text_job_url = url.clone();
        }
        if let Some(url) = &self.image_endpoint {
            config.image_url = url.clone();
        }
        if let Some(url) = &self.ledger_url {
            config.ledger_base_url = url.clone();
        }
        if let Some(secs) = self.stream_timeout {
            config.stream_timeout_secs = secs;
        }

        Ok(config)
    }

    fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".heyi").join("results")
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a page (shows the stored result instead, if there is one)
    Scan {
        /// Page URL
        url: String,

        /// Discard any stored result and scan again
        #[arg(long)]
        fresh: bool,
    },

    /// Show the stored result for a page
    Restore {
        /// Page URL
        url: String,
    },

    /// Forget the stored result for a page
    Reset {
        /// Page URL
        url: String,
    },

    /// Check whether a site's domain has been flagged before
    CheckSite {
        /// Page URL
        url: String,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let endpoints = cli.endpoints.endpoint_config()?;
    let store: SharedStore = Arc::new(FileResultStore::new(cli.endpoints.store_dir()));

    match cli.command {
        Commands::Scan { url, fresh } => run_scan(&url, fresh, &endpoints, store).await?,
        Commands::Restore { url } => {
            let controller = controller(&endpoints, store)?;
            match controller.restore(&url)? {
                Some(settled) => print_settled(&settled, true),
                None => println!("No stored result for {}", url),
            }
        }
        Commands::Reset { url } => {
            let controller = controller(&endpoints, store)?;
            match controller.restore(&url)? {
                Some(_) => {
                    controller.reset()?;
                }
                // Nothing readable; drop whatever file is there anyway
                None => controller.discard(&url)?,
            }
            println!("🧹 Cleared stored result for {}", url);
        }
        Commands::CheckSite { url } => check_site(&url, endpoints).await?,
        Commands::Status => print_status(&endpoints, &cli.endpoints.store_dir()),
    }

    Ok(())
}

fn controller(endpoints: &EndpointConfig, store: SharedStore) -> Result<OrchestrationController> {
    Ok(OrchestrationController::new(ControllerConfig::http(
        endpoints, store,
    )?))
}

async fn run_scan(
    url: &str,
    fresh: bool,
    endpoints: &EndpointConfig,
    store: SharedStore,
) -> Result<()> {
    let controller = controller(endpoints, store)?;

    if let Some(settled) = controller.restore(url)? {
        if !fresh {
            print_settled(&settled, true);
            println!("\n   Use --fresh to scan again.");
            return Ok(());
        }
        controller.reset()?;
    }

    println!("🔍 Scanning {}\n", url);
    let settled = controller.start_scan(url).await?;
    print_settled(&settled, false);

    controller.shutdown().await;
    Ok(())
}

fn print_settled(settled: &Settled, restored: bool) {
    let verdict = settled.verdict();
    let confidence = settled.display_confidence();

    if restored {
        println!("📦 Restored result for {}", settled.resource_id);
    }

    let icon = if settled.is_success() && confidence < heyi_core::AI_THRESHOLD {
        "✅"
    } else {
        "⚠️ "
    };
    println!("{} {}", icon, verdict.title());

    match &settled.result {
        Some(result) if settled.is_success() => {
            println!("   {}", verdict.subtitle(result.confidence));
            println!("   Confidence: {}%", confidence.round());
            for line in result.breakdown().lines() {
                println!("   {}", line);
            }
        }
        _ => {
            println!("   {}", verdict.subtitle(heyi_core::Score::Unavailable));
            println!("   Confidence: 0%");
        }
    }
}

async fn check_site(url: &str, endpoints: EndpointConfig) -> Result<()> {
    let lookup = FlagLookup::new(endpoints)?;
    let warning = lookup.check(url).await;

    let domain = warning
        .domain
        .clone()
        .or_else(|| domain_of(url))
        .unwrap_or_else(|| url.to_string());

    if warning.warn {
        println!(
            "⚠️  Heads up! {} is heavily flagged for AI-generated content. Proceed with caution.",
            domain
        );
    } else {
        println!("✅ {} has not been flagged", domain);
    }

    Ok(())
}

fn print_status(endpoints: &EndpointConfig, store_dir: &std::path::Path) {
    println!("📡 Text endpoint:  {}", endpoints.text_job_url);
    println!("🖼️  Image endpoint: {}", endpoints.image_url);
    println!("🗄️  Ledger:         {}", endpoints.ledger_base_url);
    println!(
        "⏱️  Timeouts:       request {}s, stream {}s",
        endpoints.request_timeout_secs, endpoints.stream_timeout_secs
    );
    println!("✂️  Text limit:     {} chars", endpoints.max_text_chars);
    println!("📦 Result store:   {}", store_dir.display());
}
