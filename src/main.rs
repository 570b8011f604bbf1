use clap::{Parser, ValueEnum};
use facelabel_api::RestApi;
use facelabel_core::{
    DocumentStore, EngineConfig, HashingTextEncoder, LabelEngine, MemoryStore, NeighborLookup,
    ReferenceEmbeddings, Strategy,
};
use facelabel_storage::{import_jsonl, LmdbDocumentStore, RecordWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LookupMode {
    /// Record id captured at rebuild time
    Id,
    /// Exact embedding value
    Embedding,
}

impl From<LookupMode> for NeighborLookup {
    fn from(mode: LookupMode) -> Self {
        match mode {
            LookupMode::Id => NeighborLookup::ById,
            LookupMode::Embedding => NeighborLookup::ByEmbedding,
        }
    }
}

/// Demographic label resolution for face embeddings
#[derive(Parser, Debug)]
#[command(name = "facelabel")]
#[command(about = "Resolve age, gender and race labels for face embeddings", long_about = None)]
struct Args {
    /// LMDB data directory; records are kept in memory when omitted
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, default_value_t = 5001)]
    http_port: u16,

    /// Reference embeddings JSON written by the text encoder
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// JSONL export to load into the store before serving
    #[arg(long)]
    import: Option<PathBuf>,

    /// Strategy used when a request names none
    #[arg(long, default_value = "quorum")]
    strategy: Strategy,

    /// Embedding dimension
    #[arg(long, default_value_t = 768)]
    dim: usize,

    /// Softmax logit scale
    #[arg(long, default_value_t = 100.0)]
    temperature: f32,

    /// Neighbours consulted by the exclusion strategy
    #[arg(long, default_value_t = 3)]
    exclusion_neighbors: usize,

    /// Cap on neighbours walked by the quorum strategy
    #[arg(long)]
    quorum_max_neighbors: Option<usize>,

    /// How neighbours are looked up in the store
    #[arg(long, value_enum, default_value_t = LookupMode::Id)]
    lookup: LookupMode,

    /// Store lookup budget per request, in milliseconds
    #[arg(long, default_value_t = 2000)]
    lookup_budget_ms: u64,

    /// Seconds between index rebuilds (0 disables)
    #[arg(long, default_value_t = 60)]
    rebuild_interval_secs: u64,

    /// Disable the record write endpoints
    #[arg(long)]
    read_only: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting facelabel v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP API port: {}", args.http_port);

    let config = EngineConfig {
        dim: args.dim,
        temperature: args.temperature,
        exclusion_neighbors: args.exclusion_neighbors,
        quorum_max_neighbors: args.quorum_max_neighbors,
        lookup: args.lookup.into(),
        lookup_budget: Duration::from_millis(args.lookup_budget_ms),
        default_strategy: args.strategy,
    };

    let reference = match &args.reference {
        Some(path) => ReferenceEmbeddings::from_file(path, args.dim)?,
        None => {
            warn!("No reference embeddings given; using hashed label text. Zero-shot results will not be meaningful");
            ReferenceEmbeddings::build(&HashingTextEncoder::new(args.dim))?
        }
    };

    let (store, writer) = match &args.data_dir {
        Some(dir) => {
            info!("Data directory: {:?}", dir);
            let lmdb = Arc::new(LmdbDocumentStore::open(dir.join("lmdb"))?);
            (
                lmdb.clone() as Arc<dyn DocumentStore>,
                lmdb as Arc<dyn RecordWriter>,
            )
        }
        None => {
            warn!("No data directory; records are kept in memory only");
            let memory = Arc::new(MemoryStore::new());
            (
                memory.clone() as Arc<dyn DocumentStore>,
                memory as Arc<dyn RecordWriter>,
            )
        }
    };

    if let Some(path) = &args.import {
        let summary = import_jsonl(path, writer.as_ref())?;
        info!(
            "Imported {} records ({} verified) from {:?}",
            summary.imported, summary.verified, path
        );
    }

    let engine = Arc::new(LabelEngine::new(config, Arc::new(reference), store)?);
    match engine.rebuild_index() {
        Ok(report) => info!("Initial index holds {} verified embeddings", report.size),
        Err(e) => error!("Initial index rebuild failed, serving with an empty index: {}", e),
    }

    if args.rebuild_interval_secs > 0 {
        let engine = engine.clone();
        let period = Duration::from_secs(args.rebuild_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // first tick completes immediately; startup already rebuilt
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let engine = engine.clone();
                match tokio::task::spawn_blocking(move || engine.rebuild_index()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("Scheduled index rebuild failed, keeping previous index: {}", e),
                    Err(e) => error!("Rebuild task panicked: {}", e),
                }
            }
        });
    }

    let engine_http = engine.clone();
    let writer_http = if args.read_only { None } else { Some(writer) };
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(engine_http, writer_http, http_port).await {
                error!("HTTP server error: {}", e);
            }
        })
    });

    info!("facelabel started successfully");
    info!("HTTP API: http://localhost:{}/", args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
