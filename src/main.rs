// src/main.rs - gateway entry point
use clap::Parser;
use mesh_gateway::config::{self, Config, ZWaveConfig};
use mesh_gateway::enocean::{EnOceanNetwork, EnOceanProtocol};
use mesh_gateway::link::driver;
use mesh_gateway::network::{Network, NetworkHandle};
use mesh_gateway::serial;
use mesh_gateway::web::api::{AppState, create_router};
use mesh_gateway::zwave::{ZWaveNetwork, ZWaveProtocol};
use std::path::Path;
use tokio::task::LocalSet;
use tracing_subscriber::fmt::MakeWriter;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Parser, Debug)]
#[command(name = "mesh-gateway", version, about = "HTTP gateway for Z-Wave and EnOcean devices")]
struct Args {
    /// Z-Wave serial device, overrides `[zwave] device`
    device: Option<String>,
    /// HTTP port, overrides the port of `[server] listen`
    port: Option<u16>,
    /// Configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: String,
}

fn build_config(args: &Args) -> Result<Config, BoxError> {
    // a device on the command line is enough to run without a file
    let mut config = if args.device.is_some() && !Path::new(&args.config).exists() {
        Config::default()
    } else {
        config::load_config(&args.config)?
    };
    if let Some(device) = &args.device {
        match &mut config.zwave {
            Some(zwave) => zwave.device = device.clone(),
            None => config.zwave = Some(ZWaveConfig::new(device.as_str())),
        }
    }
    if let Some(port) = args.port {
        config.server.listen.set_port(port);
    }
    config.validate()?;
    Ok(config)
}

/// Subscriber used until the configured log level is known.
fn startup_subscriber<W>(make_writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(make_writer)
        .finish()
}

fn spawn_network<N: Network + 'static>(
    local: &LocalSet,
    network: N,
    device: &str,
    baud: u32,
) -> Result<NetworkHandle, BoxError> {
    let port = serial::open_port(device, baud).inspect_err(|e| {
        tracing::error!("Failed to open serial device '{}': {}", device, e);
        tracing::error!("Available ports: {:?}", serial::available_ports());
    })?;
    let (handle, requests) = NetworkHandle::channel(16);
    let device = device.to_string();
    local.spawn_local(async move {
        if let Err(e) = driver::run(network, port, requests).await {
            tracing::error!("Network on '{}' stopped, its API now answers 503: {}", device, e);
        }
    });
    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let config = tracing::subscriber::with_default(startup_subscriber(std::io::stdout), || build_config(&args))?;

    tracing_subscriber::fmt()
        .with_max_level(config.logging.max_level()?)
        .init();

    tracing::info!("Starting mesh-gateway {}", env!("CARGO_PKG_VERSION"));

    let local = LocalSet::new();
    let mut state = AppState::default();

    if let Some(zwave) = &config.zwave {
        tracing::info!("Z-Wave: {} @ {} baud", zwave.device, zwave.baud);
        let protocol = ZWaveProtocol::new(zwave.ack_timeout(), zwave.response_timeout());
        let network = ZWaveNetwork::new(protocol, zwave.controller_id);
        state.zwave = Some(spawn_network(&local, network, &zwave.device, zwave.baud)?);
    }
    if let Some(enocean) = &config.enocean {
        tracing::info!("EnOcean: {} @ {} baud", enocean.device, enocean.baud);
        let network = EnOceanNetwork::new(EnOceanProtocol::new(enocean.response_timeout()));
        state.enocean = Some(spawn_network(&local, network, &enocean.device, enocean.baud)?);
    }

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    tracing::info!("Web API listening on http://{}", listener.local_addr()?);
    local
        .run_until(async move { axum::serve(listener, app).await })
        .await?;

    Ok(())
}
