use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    switchboard_chatwoot::ChatwootForwarder,
    switchboard_dify::{DifyForwarder, DifyOptions, ShapingConfig},
    switchboard_gateway::{
        AppState, SqliteConversationLinkStore, SqliteInstanceStore, serve,
    },
    switchboard_mappings::{MappingService, MappingStore, SqliteMappingStore},
    switchboard_platforms::{
        ClientRegistry, ConversationLinkStore, InstanceDirectory, InstanceStore,
    },
    switchboard_routing::{MessageBroker, RoutingEngine},
    switchboard_telegram::TelegramForwarder,
};

#[derive(Parser)]
#[command(
    name = "switchboard",
    about = "Switchboard — Telegram/Chatwoot/Dify message routing gateway"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to.
    #[arg(long, global = true, env = "SWITCHBOARD_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on.
    #[arg(long, global = true, env = "SWITCHBOARD_PORT", default_value_t = 8090)]
    port: u16,

    /// Path to the SQLite database (created when missing).
    #[arg(long, global = true, env = "SWITCHBOARD_DB", default_value = "switchboard.db")]
    db: PathBuf,

    /// Attach Dify continuity tokens so AI turns accumulate context.
    #[arg(long, global = true, env = "SWITCHBOARD_DIFY_HISTORY", default_value_t = false)]
    dify_history: bool,

    /// Hard cap on forwarded AI answers.
    #[arg(long, global = true, env = "SWITCHBOARD_MAX_RESPONSE_LEN", default_value_t = 4000)]
    max_response_len: usize,

    /// Cap on AI answers to short greetings.
    #[arg(long, global = true, env = "SWITCHBOARD_GREETING_MAX_LEN", default_value_t = 200)]
    greeting_max_len: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Some(Commands::Serve) | None => run_serve(cli).await,
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

async fn run_serve(cli: Cli) -> anyhow::Result<()> {
    let options = SqliteConnectOptions::new()
        .filename(&cli.db)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    SqliteInstanceStore::init(&pool).await?;
    SqliteConversationLinkStore::init(&pool).await?;
    SqliteMappingStore::init(&pool).await?;
    info!(db = %cli.db.display(), "database ready");

    let instance_store = Arc::new(SqliteInstanceStore::new(pool.clone()));
    let directory = Arc::new(InstanceDirectory::new(
        instance_store as Arc<dyn InstanceStore>,
    ));

    let mut registry = ClientRegistry::new();
    registry.register(Box::new(TelegramForwarder::new()?));
    registry.register(Box::new(ChatwootForwarder::new()?));
    registry.register(Box::new(DifyForwarder::new(DifyOptions {
        enable_conversation_history: cli.dify_history,
        shaping: ShapingConfig {
            simple_greeting_max_len: cli.greeting_max_len,
            max_response_len: cli.max_response_len,
            ..Default::default()
        },
    })?));
    let registry = Arc::new(registry);

    let mapping_store = Arc::new(SqliteMappingStore::new(pool.clone()));
    let mappings = Arc::new(MappingService::new(
        Arc::clone(&mapping_store) as Arc<dyn MappingStore>,
        Arc::clone(&directory),
        Arc::clone(&registry),
    ));

    let links = Arc::new(SqliteConversationLinkStore::new(pool));
    let engine = RoutingEngine::new(
        mapping_store as Arc<dyn MappingStore>,
        Arc::clone(&directory),
        registry,
        links as Arc<dyn ConversationLinkStore>,
    );
    let broker = Arc::new(MessageBroker::new(Arc::new(engine)));

    let state = AppState {
        broker,
        mappings,
        instances: directory,
    };
    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    serve(state, addr).await
}
