use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use config::{Config, File as ConfigFile};
use ensgw_alias_registry::{
    AliasRegistry, HttpMembershipService, MembershipService, OpenMembershipService,
    StaticMembershipService,
};
use ensgw_gateway::{CcipGateway, QueryDispatcher, ResponseSigner};
use ensgw_rpc::{start_server, AppState};
use ensgw_storage::{
    load_seed_file, seed_store, MemoryRecordStore, NameRecordStore, SledRecordStore,
};
use ensgw_types::{decode_address, Address, Name, DEFAULT_ALIAS_DOMAIN};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::net::{IpAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod version;

use version::{git_commit_hash, ENSGW_VERSION};

const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";
const DEFAULT_MEMBERSHIP_URL: &str = "https://buidlguidl-v3.ew.r.appspot.com/builders";
/// Well-known key used only with `--dev` when no key is configured.
const DEV_SIGNING_KEY: &str = "c99d1fec66736e414a9a0e5b9771bc12eb0214552944dda994a8e5dfece9cdf1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreBackend {
    Sled,
    Memory,
}

impl StoreBackend {
    fn from_env(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sled" => Ok(StoreBackend::Sled),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{other}'; expected 'sled' or 'memory'"),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StoreBackend::Sled => "sled",
            StoreBackend::Memory => "memory",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MembershipMode {
    Http,
    Static,
    Open,
}

impl MembershipMode {
    fn from_env(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "http" => Ok(MembershipMode::Http),
            "static" => Ok(MembershipMode::Static),
            "open" => Ok(MembershipMode::Open),
            other => anyhow::bail!(
                "unknown MEMBERSHIP_MODE '{other}'; expected 'http', 'static' or 'open'"
            ),
        }
    }
}

impl fmt::Display for MembershipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            MembershipMode::Http => "http",
            MembershipMode::Static => "static",
            MembershipMode::Open => "open",
        };
        f.write_str(value)
    }
}

#[derive(Clone)]
struct AppConfig {
    config_path: Option<PathBuf>,

    // Network
    rpc_host: String,
    rpc_port: u16,

    // Signing
    signing_key: String,
    record_ttl_secs: u64,

    // Storage
    store_backend: StoreBackend,
    db_path: String,
    seed_file: Option<PathBuf>,
    alias_domain: String,

    // Membership
    membership_mode: MembershipMode,
    membership_url: String,
    membership_allowlist: Vec<String>,
    io_timeout_ms: u64,

    // Observability
    prometheus_enabled: bool,
    log_level: String,
    log_format: String,

    // Development
    dev_mode: bool,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("config_path", &self.config_path)
            .field("rpc_host", &self.rpc_host)
            .field("rpc_port", &self.rpc_port)
            .field("signing_key", &"<redacted>")
            .field("record_ttl_secs", &self.record_ttl_secs)
            .field("store_backend", &self.store_backend)
            .field("db_path", &self.db_path)
            .field("seed_file", &self.seed_file)
            .field("alias_domain", &self.alias_domain)
            .field("membership_mode", &self.membership_mode)
            .field("membership_url", &self.membership_url)
            .field("membership_allowlist", &self.membership_allowlist)
            .field("io_timeout_ms", &self.io_timeout_ms)
            .field("prometheus_enabled", &self.prometheus_enabled)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
}

impl AppConfig {
    fn load(config_path_override: Option<&str>) -> Result<Self> {
        let resolved_path = if let Some(path) = config_path_override {
            let path = PathBuf::from(path);
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            Some(path)
        } else {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if path.exists() {
                Some(path)
            } else {
                None
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(config::Environment::with_prefix("ENSGW"));
        let config = builder.build()?;

        Self::from_config(&config, resolved_path)
    }

    fn from_config(config: &Config, config_path: Option<PathBuf>) -> Result<Self> {
        let store_backend = StoreBackend::from_env(
            &get_string_value(config, &["STORE_BACKEND", "store.backend"])
                .unwrap_or_else(|| "sled".to_string()),
        )?;
        let membership_mode = MembershipMode::from_env(
            &get_string_value(config, &["MEMBERSHIP_MODE", "membership.mode"])
                .unwrap_or_else(|| "http".to_string()),
        )?;

        let membership_allowlist: Vec<String> =
            get_string_value(config, &["MEMBERSHIP_ALLOWLIST", "membership.allowlist"])
                .unwrap_or_default()
                .split(',')
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect();

        Ok(AppConfig {
            config_path,
            rpc_host: get_string_value(config, &["RPC_HOST", "rpc.host"])
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            rpc_port: get_string_value(config, &["RPC_PORT", "rpc.port"])
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("RPC_PORT must be a port number")?,
            signing_key: get_string_value(config, &["SIGNING_KEY", "gateway.signing_key"])
                .unwrap_or_default(),
            record_ttl_secs: get_string_value(config, &["RECORD_TTL_SECS", "gateway.ttl_secs"])
                .unwrap_or_else(|| "300".to_string())
                .parse()
                .context("RECORD_TTL_SECS must be a number of seconds")?,
            store_backend,
            db_path: get_string_value(config, &["DB_PATH", "store.db_path"])
                .unwrap_or_else(|| "./data/ensgw".to_string()),
            seed_file: get_string_value(config, &["SEED_FILE", "store.seed_file"])
                .map(PathBuf::from),
            alias_domain: get_string_value(config, &["ALIAS_DOMAIN", "aliases.domain"])
                .unwrap_or_else(|| DEFAULT_ALIAS_DOMAIN.to_string()),
            membership_mode,
            membership_url: get_string_value(config, &["MEMBERSHIP_URL", "membership.url"])
                .unwrap_or_else(|| DEFAULT_MEMBERSHIP_URL.to_string()),
            membership_allowlist,
            io_timeout_ms: get_string_value(config, &["IO_TIMEOUT_MS", "gateway.io_timeout_ms"])
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .context("IO_TIMEOUT_MS must be a number of milliseconds")?,
            prometheus_enabled: get_bool_value(
                config,
                &["METRICS_ENABLED", "metrics.enabled"],
                true,
            ),
            log_level: get_string_value(config, &["LOG_LEVEL", "log.level"])
                .unwrap_or_else(|| "info".to_string()),
            log_format: get_string_value(config, &["LOG_FORMAT", "log.format"])
                .unwrap_or_else(|| "pretty".to_string()),
            dev_mode: get_bool_value(config, &["DEV_MODE"], false),
        })
    }

    fn validate(&self) -> Result<()> {
        if self.signing_key.trim().is_empty() {
            anyhow::bail!("SIGNING_KEY must not be empty; set ENSGW_SIGNING_KEY or use --dev");
        }
        ResponseSigner::from_hex(&self.signing_key).context("SIGNING_KEY is invalid")?;
        if self.record_ttl_secs == 0 {
            anyhow::bail!("RECORD_TTL_SECS must be greater than zero");
        }
        if self.rpc_port == 0 {
            anyhow::bail!("RPC_PORT must be greater than zero");
        }
        if self.io_timeout_ms == 0 {
            anyhow::bail!("IO_TIMEOUT_MS must be greater than zero");
        }
        if self.store_backend == StoreBackend::Sled && self.db_path.trim().is_empty() {
            anyhow::bail!("DB_PATH must not be empty when STORE_BACKEND is sled");
        }
        match Name::parse(self.alias_domain.as_str()) {
            Ok(name) if !name.is_root() => {}
            _ => anyhow::bail!(
                "ALIAS_DOMAIN '{}' must be a normalized, non-empty name",
                self.alias_domain
            ),
        }
        match self.membership_mode {
            MembershipMode::Http if self.membership_url.trim().is_empty() => {
                anyhow::bail!("MEMBERSHIP_URL must be set when MEMBERSHIP_MODE is http")
            }
            MembershipMode::Static => {
                self.allowlist()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn allowlist(&self) -> Result<Vec<Address>> {
        self.membership_allowlist
            .iter()
            .map(|value| {
                decode_address(value)
                    .with_context(|| format!("MEMBERSHIP_ALLOWLIST entry '{value}' is invalid"))
            })
            .collect()
    }

    fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    fn rpc_addr(&self) -> String {
        match self.rpc_host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{ip}]:{}", self.rpc_port),
            _ => format!("{}:{}", self.rpc_host, self.rpc_port),
        }
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn get_bool_value(config: &Config, keys: &[&str], default: bool) -> bool {
    for key in keys {
        if let Ok(value) = config.get_bool(key) {
            return value;
        }
        if let Ok(raw) = config.get_string(key) {
            if let Ok(parsed) = raw.parse::<bool>() {
                return parsed;
            }
        }
    }
    default
}

fn load_config_with_overrides(matches: &clap::ArgMatches) -> Result<AppConfig> {
    let config_path = matches
        .get_one::<String>("config")
        .map(|value| value.as_str());
    let mut config = AppConfig::load(config_path)?;
    apply_overrides(matches, &mut config);
    Ok(config)
}

fn apply_overrides(matches: &clap::ArgMatches, config: &mut AppConfig) {
    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }

    if let Some(rpc_host) = matches.get_one::<String>("rpc-host") {
        config.rpc_host = rpc_host.clone();
    }

    if let Some(rpc_port) = matches.get_one::<u16>("rpc-port") {
        config.rpc_port = *rpc_port;
    }

    if matches.get_flag("disable-metrics") {
        config.prometheus_enabled = false;
    }

    if matches.get_flag("dev") {
        config.dev_mode = true;
    }

    if config.dev_mode {
        config.log_level = "debug".to_string();
        config.log_format = "pretty".to_string();
        if config.signing_key.trim().is_empty() {
            config.signing_key = DEV_SIGNING_KEY.to_string();
        }
    }
}

fn build_cli() -> Command {
    Command::new("ensgw-node")
        .version(ENSGW_VERSION)
        .about("CCIP-Read gateway for off-chain ENS names")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .global(true),
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .action(ArgAction::SetTrue)
                .help("Run in development mode with a well-known signing key")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level")
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format")
                .global(true),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("Override HTTP bind host")
                .global(true),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override HTTP port")
                .global(true),
        )
        .arg(
            Arg::new("disable-metrics")
                .long("disable-metrics")
                .action(ArgAction::SetTrue)
                .help("Disable the Prometheus metrics exporter")
                .global(true),
        )
        .subcommand(Command::new("start").about("Start the gateway (default)"))
        .subcommand(
            Command::new("seed")
                .about("Load name records from a JSON file into the store, then exit")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_name("PATH")
                        .required(true)
                        .help("JSON object mapping names to records"),
                ),
        )
        .subcommand(Command::new("check").about("Validate configuration and environment, then exit"))
        .subcommand(
            Command::new("status")
                .about("Query the /health endpoint of a running gateway")
                .arg(
                    Arg::new("health-path")
                        .long("health-path")
                        .value_name("PATH")
                        .default_value("/health")
                        .help("Health endpoint path to query"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config_with_overrides(&matches)?;

    match matches.subcommand() {
        Some(("check", _)) => {
            print_version_info();
            run_self_check(&config)
        }
        Some(("status", sub)) => {
            let health_path = sub
                .get_one::<String>("health-path")
                .map(|value| value.as_str())
                .unwrap_or("/health");
            check_status(&config, health_path).await
        }
        Some(("seed", sub)) => {
            init_logging(&config)?;
            let file = sub
                .get_one::<String>("file")
                .map(PathBuf::from)
                .context("--file is required")?;
            run_seed(&config, &file).await
        }
        _ => {
            config.validate()?;
            init_logging(&config)?;
            run_gateway(config).await
        }
    }
}

/// Store handle kept concrete so the sled backend can be flushed on exit.
enum OpenedStore {
    Sled(Arc<SledRecordStore>),
    Memory(Arc<MemoryRecordStore>),
}

impl OpenedStore {
    fn open(config: &AppConfig) -> Result<Self> {
        match config.store_backend {
            StoreBackend::Sled => {
                if let Some(parent) = Path::new(&config.db_path).parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
                let store = SledRecordStore::new(&config.db_path, config.alias_domain.clone())
                    .with_context(|| format!("failed to open sled store at {}", config.db_path))?;
                Ok(OpenedStore::Sled(Arc::new(store)))
            }
            StoreBackend::Memory => Ok(OpenedStore::Memory(Arc::new(MemoryRecordStore::new(
                config.alias_domain.clone(),
            )))),
        }
    }

    fn shared(&self) -> Arc<dyn NameRecordStore> {
        match self {
            OpenedStore::Sled(store) => store.clone(),
            OpenedStore::Memory(store) => store.clone(),
        }
    }

    fn flush(&self) -> Result<()> {
        if let OpenedStore::Sled(store) = self {
            store.flush().context("failed to flush sled store")?;
        }
        Ok(())
    }
}

fn build_membership(config: &AppConfig) -> Result<Arc<dyn MembershipService>> {
    let service: Arc<dyn MembershipService> = match config.membership_mode {
        MembershipMode::Http => {
            let service =
                HttpMembershipService::new(config.membership_url.clone(), config.io_timeout())
                    .context("failed to build membership HTTP client")?;
            info!(url = service.url(), "alias claims checked against membership list");
            Arc::new(service)
        }
        MembershipMode::Static => {
            let service = StaticMembershipService::new(config.allowlist()?);
            if service.is_empty() {
                warn!("membership allowlist is empty; every alias claim will be rejected");
            } else {
                info!(members = service.len(), "alias claims checked against static allowlist");
            }
            Arc::new(service)
        }
        MembershipMode::Open => {
            warn!("MEMBERSHIP_MODE is open; any signer may claim an alias");
            Arc::new(OpenMembershipService)
        }
    };
    Ok(service)
}

async fn seed_from_file(store: &dyn NameRecordStore, path: &Path) -> Result<usize> {
    let records = load_seed_file(path)
        .with_context(|| format!("failed to load seed records from {}", path.display()))?;
    seed_store(store, records)
        .await
        .context("failed to write seed records")
}

async fn run_seed(config: &AppConfig, file: &Path) -> Result<()> {
    let store = OpenedStore::open(config)?;
    let total = seed_opened(&store, file).await?;
    println!("Seeded {total} records into {} store", config.store_backend);
    Ok(())
}

async fn seed_opened(store: &OpenedStore, file: &Path) -> Result<usize> {
    let total = seed_from_file(store.shared().as_ref(), file).await?;
    store.flush()?;
    Ok(total)
}

async fn run_gateway(config: AppConfig) -> Result<()> {
    print_version_info();
    info!(?config, "starting gateway");

    let metrics = init_metrics(&config);
    let store = OpenedStore::open(&config)?;
    if let Some(seed_file) = &config.seed_file {
        if seed_file.exists() {
            seed_from_file(store.shared().as_ref(), seed_file).await?;
        } else {
            warn!("Seed file {} does not exist; skipping", seed_file.display());
        }
    }

    let signer = ResponseSigner::from_hex(&config.signing_key).context("SIGNING_KEY is invalid")?;
    if config.dev_mode && config.signing_key == DEV_SIGNING_KEY {
        warn!("Using the well-known development signing key");
    }
    info!("Responses are signed by {}", signer.address());

    let dispatcher = QueryDispatcher::new(store.shared(), config.record_ttl_secs)
        .with_io_timeout(config.io_timeout());
    let gateway = CcipGateway::new(dispatcher, signer);
    let registry = AliasRegistry::new(store.shared(), build_membership(&config)?)
        .with_io_timeout(config.io_timeout());
    info!(
        "Alias claims use {} membership under {}",
        config.membership_mode, config.alias_domain
    );

    let state = AppState::new(Arc::new(gateway), Arc::new(registry)).with_metrics(metrics);
    start_server(state, &config.rpc_addr(), shutdown_signal()).await?;

    store.flush()?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn check_status(config: &AppConfig, health_path: &str) -> Result<()> {
    let mut path = health_path.to_string();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }
    let url = format!("http://{}{}", config.rpc_addr(), path);
    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    println!("GET {url} -> {status}");
    println!("{body}");
    if status.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Health check failed with status {status}")
    }
}

fn init_metrics(config: &AppConfig) -> Option<PrometheusHandle> {
    if !config.prometheus_enabled {
        info!("Prometheus metrics exporter disabled via configuration");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics exporter registered");
            describe_counter!(
                "ensgw_resolve_requests_total",
                "CCIP-Read resolve requests received"
            );
            describe_counter!(
                "ensgw_resolve_failures_total",
                "CCIP-Read resolve requests that failed, by error kind"
            );
            describe_counter!(
                "ensgw_alias_claims_total",
                "Alias claim attempts, by outcome"
            );
            Some(handle)
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics exporter: {}", err);
            None
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    Ok(())
}

fn print_version_info() {
    println!("ensgw {} (commit {})", ENSGW_VERSION, git_commit_hash());
}

fn run_self_check(config: &AppConfig) -> Result<()> {
    println!("Running gateway self-check...");
    let mut issues = Vec::new();

    if let Err(err) = config.validate() {
        issues.push(format!("{err:#}"));
    } else if let Ok(signer) = ResponseSigner::from_hex(&config.signing_key) {
        println!("Signer address: {}", signer.address());
    }

    if let Some(path) = &config.config_path {
        println!("Configuration file: {}", path.display());
    }

    if let Err(err) = ensure_port_available(&config.rpc_host, config.rpc_port) {
        issues.push(err);
    }

    if config.store_backend == StoreBackend::Sled {
        if let Err(err) = ensure_storage_directory(&config.db_path) {
            issues.push(err);
        }
    }

    if let Some(seed_file) = &config.seed_file {
        if !seed_file.exists() {
            issues.push(format!("Seed file {} does not exist", seed_file.display()));
        } else if let Err(err) = load_seed_file(seed_file) {
            issues.push(format!("Seed file {} is invalid: {err}", seed_file.display()));
        }
    }

    if issues.is_empty() {
        println!("OK");
        Ok(())
    } else {
        for issue in &issues {
            eprintln!("- {issue}");
        }
        anyhow::bail!("self-check failed")
    }
}

fn ensure_port_available(host: &str, port: u16) -> Result<(), String> {
    let addr = match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{ip}]:{port}"),
        _ => format!("{host}:{port}"),
    };
    TcpListener::bind(&addr)
        .map(drop)
        .map_err(|err| format!("HTTP port {addr} is not available: {err}"))
}

fn ensure_storage_directory(db_path: &str) -> Result<(), String> {
    let path = Path::new(db_path);
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if parent.exists() {
        let metadata = std::fs::metadata(parent)
            .map_err(|err| format!("Cannot read {}: {err}", parent.display()))?;
        if metadata.permissions().readonly() {
            return Err(format!("Database directory {} is read-only", parent.display()));
        }
        Ok(())
    } else {
        std::fs::create_dir_all(parent)
            .map_err(|err| format!("Cannot create database directory {}: {err}", parent.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_config(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("config")
            .join(name)
    }

    fn base_config() -> AppConfig {
        AppConfig {
            config_path: None,
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: 8080,
            signing_key: DEV_SIGNING_KEY.to_string(),
            record_ttl_secs: 300,
            store_backend: StoreBackend::Memory,
            db_path: "./data/ensgw".to_string(),
            seed_file: None,
            alias_domain: "loogies.eth".to_string(),
            membership_mode: MembershipMode::Open,
            membership_url: DEFAULT_MEMBERSHIP_URL.to_string(),
            membership_allowlist: vec![],
            io_timeout_ms: 5_000,
            prometheus_enabled: false,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            dev_mode: false,
        }
    }

    #[test]
    fn bundled_config_loads_defaults() {
        let path = fixture_config("gateway.toml");
        let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(config.rpc_port, 8080);
        assert_eq!(config.record_ttl_secs, 300);
        assert_eq!(config.store_backend, StoreBackend::Sled);
        assert_eq!(config.alias_domain, "loogies.eth");
        assert_eq!(config.membership_mode, MembershipMode::Http);
        assert_eq!(config.membership_url, DEFAULT_MEMBERSHIP_URL);
        assert_eq!(config.io_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn bundled_seed_file_is_valid() {
        let records = load_seed_file(fixture_config("records.example.json")).unwrap();
        assert!(records.contains_key("test.eth"));
        assert!(records.contains_key("*.test.eth"));
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let err = AppConfig::load(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"), "unexpected error: {err}");
    }

    #[test]
    fn toml_file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "RPC_PORT = 9090\nSTORE_BACKEND = \"memory\"\nMEMBERSHIP_MODE = \"static\"\n\
             MEMBERSHIP_ALLOWLIST = \"0x70997970C51812dc3A010C7d01b50e0d17dc79C8, \"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.rpc_port, 9090);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.membership_mode, MembershipMode::Static);
        assert_eq!(config.allowlist().unwrap().len(), 1);
    }

    #[test]
    fn validate_accepts_base_config() {
        base_config().validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = base_config();
        config.signing_key = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("SIGNING_KEY"));

        let mut config = base_config();
        config.signing_key = "0x1234".to_string();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.record_ttl_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("RECORD_TTL_SECS"));

        let mut config = base_config();
        config.rpc_port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("RPC_PORT"));

        let mut config = base_config();
        config.alias_domain = "Loogies.eth".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("ALIAS_DOMAIN"));

        let mut config = base_config();
        config.membership_mode = MembershipMode::Static;
        config.membership_allowlist = vec!["nope".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_signing_key() {
        let rendered = format!("{:?}", base_config());
        assert!(!rendered.contains(DEV_SIGNING_KEY));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn dev_flag_supplies_signing_key_and_debug_logging() {
        let matches = build_cli()
            .try_get_matches_from(["ensgw-node", "--dev", "--rpc-port", "9999"])
            .unwrap();
        let mut config = base_config();
        config.signing_key = String::new();
        apply_overrides(&matches, &mut config);

        assert!(config.dev_mode);
        assert_eq!(config.signing_key, DEV_SIGNING_KEY);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.rpc_port, 9999);
    }

    #[test]
    fn seed_subcommand_requires_file() {
        assert!(build_cli()
            .try_get_matches_from(["ensgw-node", "seed"])
            .is_err());
        let matches = build_cli()
            .try_get_matches_from(["ensgw-node", "seed", "--file", "records.json"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "seed");
        assert_eq!(sub.get_one::<String>("file").unwrap(), "records.json");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let mut config = base_config();
        config.rpc_host = "::1".to_string();
        assert_eq!(config.rpc_addr(), "[::1]:8080");
    }

    #[tokio::test]
    async fn seed_writes_records_into_sled_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = base_config();
        config.store_backend = StoreBackend::Sled;
        config.db_path = dir.path().join("db").to_string_lossy().into_owned();

        let store = OpenedStore::open(&config).unwrap();
        let total = seed_opened(&store, &fixture_config("records.example.json"))
            .await
            .unwrap();
        assert_eq!(total, 2);

        let shared = store.shared();
        assert!(shared.get_record("test.eth").await.unwrap().is_some());
        assert!(shared.get_record("*.test.eth").await.unwrap().is_some());
    }
}
