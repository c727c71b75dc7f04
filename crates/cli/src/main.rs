use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    parley_gateway::{LOADER_NAME, Loader, LoopbackTransport, ModuleRegistry, TRANSPORT_NAME},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "parley", about = "Parley: SMS commands for pluggable modules")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(
        short,
        long,
        global = true,
        env = "PARLEY_CONFIG",
        default_value = parley_config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the config and run every enabled module (default).
    Run,
    /// Load the config, report what would run, and exit.
    Check,
    /// List the registered modules.
    Modules,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    parley_modules::register_all(&mut registry)?;
    let factory = LoopbackTransport::factory();
    registry.set_transport(move |block| factory(block));
    Ok(registry)
}

fn load(path: &Path) -> anyhow::Result<Loader> {
    let mut loader = Loader::new(registry()?);
    loader.load_config_file(path)?;
    Ok(loader)
}

async fn run(path: &Path) -> anyhow::Result<()> {
    let loader = load(path)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for ctrl-c");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    loader.start(cancel).await?;
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let registry = registry()?;
    let names: Vec<String> = registry.names().into_iter().map(String::from).collect();
    let mut loader = Loader::new(registry);
    loader.load_config_file(path)?;

    println!("config:    {}", path.display());
    println!(
        "loader:    {}",
        if loader.is_enabled(LOADER_NAME) {
            "enabled"
        } else {
            "disabled (nothing will run)"
        }
    );
    match loader.transport() {
        Some(transport) => println!("transport: {}", transport.name()),
        None if loader.is_enabled(TRANSPORT_NAME) => println!("transport: enabled"),
        None => println!("transport: disabled"),
    }
    let listen = &loader.config().http.listen_addr;
    println!(
        "http:      {}",
        if listen.is_empty() { "disabled" } else { listen.as_str() }
    );
    for name in &names {
        let state = if loader.is_enabled(name) {
            "enabled"
        } else {
            "disabled"
        };
        println!("  {name:<12} {state}");
    }
    Ok(())
}

fn list_modules() -> anyhow::Result<()> {
    for name in registry()?.names() {
        println!("{name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parley starting");

    let result = match cli.command {
        None | Some(Commands::Run) => run(&cli.config).await,
        Some(Commands::Check) => check(&cli.config),
        Some(Commands::Modules) => list_modules(),
    };

    if let Err(e) = result {
        error!(error = %format!("{e:#}"), "parley failed");
        std::process::exit(1);
    }
}
