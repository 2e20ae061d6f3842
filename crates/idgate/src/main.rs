//! idgate entry point.

use std::path::PathBuf;

use anyhow::Context;
use idgate::{GatewayConfig, GatewayServer, TlsSource};
use idgate_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
use tracing::{error, info};

/// Command-line arguments. Flags win over the file and the environment.
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    upstream: Option<String>,
    http_port: Option<u16>,
    tls_dir: Option<PathBuf>,
    tls_secret: Option<String>,
    disable_auth: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => parsed.config = args.next().map(PathBuf::from),
                "--upstream" | "--grpc-server" => parsed.upstream = args.next(),
                "--http-port" => {
                    parsed.http_port = match args.next().map(|p| p.parse()) {
                        Some(Ok(port)) => Some(port),
                        _ => {
                            eprintln!("--http-port expects a port number");
                            std::process::exit(1);
                        }
                    };
                }
                "--tls-dir" => parsed.tls_dir = args.next().map(PathBuf::from),
                "--tls-secret" | "--dex-grpc-cert-secret" => parsed.tls_secret = args.next(),
                "--disable-auth" => parsed.disable_auth = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("idgate {}", idgate::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        parsed
    }

    fn apply(self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(upstream) = self.upstream {
            config.upstream.url = upstream;
        }
        if let Some(port) = self.http_port {
            config.server.listen_port = port;
        }
        if let Some(dir) = self.tls_dir {
            config.upstream.tls = Some(TlsSource::Dir(dir));
        }
        if let Some(secret) = self.tls_secret {
            config.upstream.tls = Some(TlsSource::Secret(secret));
        }
        if self.disable_auth {
            config.auth.enabled = false;
        }
        config
    }
}

fn print_help() {
    println!(
        r"idgate - authenticating gateway for the Dex password API

USAGE:
    idgate [OPTIONS]

OPTIONS:
    -c, --config <PATH>          Path to configuration file (TOML or JSON)
        --upstream <URL>         Backend address (alias: --grpc-server, default: dex:5557)
        --http-port <PORT>       Listen port (default: 8080)
        --tls-dir <DIR>          Directory with ca.crt, tls.crt and tls.key
        --tls-secret <NS/NAME>   Kubernetes secret with the same keys
                                 (alias: --dex-grpc-cert-secret)
        --disable-auth           Skip authentication and authorization
    -h, --help                   Print help information
    -v, --version                Print version information

ENVIRONMENT VARIABLES:
    IDGATE_LISTEN_PORT        Listen port
    IDGATE_UPSTREAM_URL       Backend address
    IDGATE_UPSTREAM_TIMEOUT   Backend timeout, e.g. 30s
    IDGATE_TLS_DIR            Client TLS directory
    IDGATE_TLS_SECRET         Client TLS secret (namespace/name)
    IDGATE_AUTH_ENABLED       true or false
    IDGATE_ISSUER_URL         Expected token issuer
    IDGATE_JWKS_URL           Provider key set URL
    IDGATE_AUDIENCE           Expected token audience
    IDGATE_ALLOWED_ROLES      Comma-separated cluster roles
    IDGATE_BCRYPT_COST        bcrypt cost (4-31)
    IDGATE_LOG_LEVEL          Log filter, e.g. info or idgate=debug
"
    );
}

fn load_config(args: Args) -> anyhow::Result<GatewayConfig> {
    let config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    let config = args.apply(config.with_env_overrides());
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let metrics = if config.telemetry.metrics_enabled {
        Some(init_metrics(&MetricsConfig::default())?)
    } else {
        None
    };

    info!("Starting idgate v{}", idgate::VERSION);
    info!(
        "Listening on {}:{}",
        config.server.listen_addr, config.server.listen_port
    );
    info!(auth_enabled = config.auth.enabled, "Upstream: {}", config.upstream.base_url());

    let server = GatewayServer::from_config(config, metrics)
        .await
        .context("failed to create server")?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("idgate stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    let log_config = if config.telemetry.json_logs {
        LogConfig::production()
    } else {
        LogConfig::development()
    }
    .with_level(config.telemetry.log_level.clone());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
