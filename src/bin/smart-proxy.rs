//! Smart Proxy Binary
//!
//! Usage: smart-proxy [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>  Path to configuration file
//!   --interfaces         List network interfaces
//!   --check <HOST>       Show the route chosen for a host
//!   -h, --help           Print help information

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use smart_proxy::net::SystemInterfaces;
use smart_proxy::server::{default_config_dir, ConfigFile, ProxyConfig, CONFIG_FILE_NAME};
use smart_proxy::ProxyServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => run(default_config_path()?).await?,
        Some("-h") | Some("--help") => print_usage(),
        Some("--interfaces") => list_interfaces()?,
        Some("-c") | Some("--config") => match args.get(2) {
            Some(path) => run(PathBuf::from(path)).await?,
            None => eprintln!("Error: --config requires a file path"),
        },
        Some("--check") => match args.get(2) {
            Some(host) => check_route(host, args.get(3).map(PathBuf::from)).await?,
            None => eprintln!("Error: --check requires a host name"),
        },
        Some(other) => {
            eprintln!("Unknown option: {}", other);
            print_usage();
        }
    }

    Ok(())
}

fn print_usage() {
    println!(
        r#"Smart Proxy - per-domain egress interface selection for SOCKS5

USAGE:
    smart-proxy [OPTIONS]

OPTIONS:
    -c, --config <FILE>         Path to configuration file
                                (default: ~/.smart-proxy/config.json)
    --interfaces                List network interfaces with addresses
    --check <HOST> [FILE]       Load the blocklist and print the route for HOST
    -h, --help                  Print help information

ENVIRONMENT:
    RUST_LOG                    Log filter (default: info)

EXAMPLES:
    Run with the default configuration:
        smart-proxy

    Check where a domain would go:
        smart-proxy --check www.google.com
"#
    );
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    let dir = default_config_dir().context("cannot determine home directory")?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load the config at `path`, writing defaults if it does not exist yet.
fn load_or_init(path: PathBuf) -> anyhow::Result<(ConfigFile, ProxyConfig)> {
    let file = ConfigFile::new(path);
    let config = if file.exists() {
        file.load()
            .with_context(|| format!("failed to load {}", file.path().display()))?
    } else {
        let config = ProxyConfig::default();
        file.save(&config)
            .with_context(|| format!("failed to write {}", file.path().display()))?;
        tracing::info!("Wrote default configuration to {}", file.path().display());
        config
    };
    config.validate()?;
    Ok((file, config))
}

fn build_server(file: &ConfigFile, config: ProxyConfig) -> ProxyServer {
    let server = ProxyServer::new(config);
    match file.dir() {
        Some(dir) => server.with_config_dir(dir),
        None => server,
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let (file, config) = load_or_init(config_path)?;
    let auto_start = config.auto_start;

    tracing::info!("Default interface: {}", config.default_interface);
    tracing::info!("Blocklist interface: {}", config.blocklist_interface);
    tracing::info!("Company interface: {}", config.company_interface);

    if !auto_start {
        tracing::info!("autoStart is disabled in {}; not starting", file.path().display());
        return Ok(());
    }

    let server = build_server(&file, config);
    server.start()?;

    tokio::signal::ctrl_c().await?;
    server.stop().await;
    tracing::info!("{}", server.metrics().format_report());

    Ok(())
}

fn list_interfaces() -> anyhow::Result<()> {
    for iface in SystemInterfaces.list()? {
        let addresses: Vec<String> = iface.addresses.iter().map(ToString::to_string).collect();
        println!("{:>3}  {:<12} {}", iface.index, iface.name, addresses.join(", "));
    }
    Ok(())
}

async fn check_route(host: &str, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => default_config_path()?,
    };
    let (file, config) = load_or_init(path)?;
    let server = build_server(&file, config);

    if let Err(e) = server.reload_blocklist().await {
        eprintln!("Warning: {}", e);
    }

    let router = smart_proxy::Router::new(
        std::sync::Arc::clone(server.classifier()),
        server.config().interface_names(),
    );
    let route = router.route(host);
    println!("{} -> {} ({})", host, router.interface_for(route), route);

    Ok(())
}
