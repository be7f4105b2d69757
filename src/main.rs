use clap::Parser;
use indicatif::MultiProgress;
use std::path::PathBuf;
use thread_grabber::config::{ConfigLoader, Overrides};
use thread_grabber::progress::{IndicatifRenderer, PlainRenderer, RunSummary};
use thread_grabber::Scraper;

#[derive(Parser)]
#[command(name = "thread-grabber")]
#[command(version)]
#[command(about = "Download every image referenced by a thread page", long_about = None)]
struct Cli {
    /// Thread page to scrape
    #[arg(long)]
    url: String,

    /// Directory the images are saved to (created if missing)
    #[arg(long)]
    path: PathBuf,

    /// Number of concurrent download workers [default: 1]
    #[arg(long = "thread")]
    workers: Option<usize>,

    /// Optional tuning file (JSON/YAML/TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL for relative image references [default: the thread's origin]
    #[arg(long)]
    origin: Option<String>,

    /// Timeout in seconds for the page and for each image
    #[arg(long)]
    timeout: Option<u64>,

    /// Redraw a plain text bar instead of the animated one
    #[arg(long)]
    plain: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = MultiProgress::new();

    if cli.plain {
        log::set_boxed_logger(Box::new(logger))?;
    } else {
        indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
    }
    log::set_max_level(level);

    let config = ConfigLoader::resolve(
        cli.config.as_deref(),
        Overrides {
            workers: cli.workers,
            origin: cli.origin,
            request_timeout_secs: cli.timeout,
        },
    )?;
    if let Some(path) = &cli.config {
        log::info!("Loaded config from {:?}", path);
    }

    let scraper = Scraper::from_config(&config)?;
    log::info!("Starting scrape of {}", cli.url);
    let summary = if cli.plain {
        scraper
            .run(&cli.url, &cli.path, PlainRenderer::new(config.bar_width))
            .await?
    } else {
        scraper
            .run(
                &cli.url,
                &cli.path,
                IndicatifRenderer::new(&multi, config.bar_width),
            )
            .await?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n✅ Scrape Completed:");
    println!("   Images Found: {}", summary.total);
    println!("   Attempted: {}", summary.attempted);
    println!("   Saved: {}", summary.succeeded);
    println!("   Failed: {}", summary.failed);
    println!("   Total Time: {:.1}s", summary.elapsed_seconds);
    if !summary.complete {
        println!("   ⚠ {} image(s) never reported back", summary.total - summary.attempted);
    }
    for failure in &summary.failures {
        println!("   ❌ {}: {}", failure.url, failure.reason);
    }
}
