use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvas_painter::artifact::HttpArtifactService;
use canvas_painter::config::Config;
use canvas_painter::dispatch::Dispatcher;
use canvas_painter::ledger::RpcLedger;
use canvas_painter::metrics::PaintMetrics;
use canvas_painter::pipeline::Painter;
use canvas_painter::pool::WorkerPool;
use canvas_painter::signing::Identity;
use canvas_painter::source::{decode_image, pixel_jobs};
use canvas_painter::types::CanvasOffset;

#[derive(Parser, Debug)]
#[command(name = "canvas-painter")]
#[command(about = "Paint an image onto the on-chain canvas, one pixel per transaction", long_about = None)]
struct Args {
    /// The path to the source image file
    #[arg(long)]
    source: Option<PathBuf>,

    /// Starting x coordinate
    #[arg(long, allow_negative_numbers = true)]
    x: Option<i64>,

    /// Starting y coordinate
    #[arg(long, allow_negative_numbers = true)]
    y: Option<i64>,
}

impl Args {
    /// The image path and canvas offset, or the usage line for the first missing flag.
    fn required(self) -> Result<(PathBuf, CanvasOffset), &'static str> {
        let source = self.source.ok_or("Please provide a source image using the --source flag")?;
        let x = self.x.ok_or("Please provide a starting x coordinate using the --x flag")?;
        let y = self.y.ok_or("Please provide a starting y coordinate using the --y flag")?;
        Ok((source, CanvasOffset::new(x, y)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canvas_painter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (source, offset) = match Args::parse().required() {
        Ok(flags) => flags,
        Err(usage) => {
            println!("{usage}");
            process::exit(1);
        }
    };

    let config = Config::from_env()?;
    config.validate()?;

    let img = decode_image(&source).with_context(|| format!("reading {}", source.display()))?;
    let identity = Arc::new(Identity::from_base58(&config.keypair).context("loading KEYPAIR")?);
    info!(pubkey = %identity.pubkey_base58(), "loaded identity");

    // one client, one timeout, for every network call
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("building http client")?;

    let painter = Painter::new(
        identity,
        HttpArtifactService::new(client.clone(), &config.artifact_api_url),
        RpcLedger::new(client, &config.rpc_url),
        offset,
    )
    .with_confirmation(config.confirm_paints);

    info!(workers = config.worker_count, "Init worker pool");
    let metrics = Arc::new(PaintMetrics::new());
    let pool = WorkerPool::start(config.worker_count, config.queue_capacity, Arc::new(painter), metrics)?;

    Dispatcher::new(config.skip_whitespace).run(pool, pixel_jobs(&img)).await?;

    info!("Done");
    Ok(())
}
