use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use rust_ndnfw_common::name::Name;
use rust_ndnfw_daemon::clock::SystemClock;
use rust_ndnfw_daemon::config::ForwarderConfig;
use rust_ndnfw_daemon::event_loop::{EventLoop, PacketIn};
use rust_ndnfw_daemon::face::transport::InternalTransport;
use rust_ndnfw_daemon::face::FaceScope;
use rust_ndnfw_daemon::Forwarder;
use std::path::PathBuf;
use std::sync::Arc;

/// NDN forwarding daemon
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Path to the configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Sets the level of verbosity
    #[clap(short, long)]
    verbose: bool,

    /// Static routes to install at startup, as prefix=faceId pairs for the
    /// internal face (e.g. `/localhost=1`)
    #[clap(long)]
    route: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    let config =
        ForwarderConfig::load(cli.config.as_deref()).context("loading configuration")?;
    info!(
        "starting forwarder: cs_max_packets={} cs_policy={} strategy={}",
        config.cs_max_packets, config.cs_policy, config.strategy_choice_default
    );

    let mut forwarder = Forwarder::new(config, Arc::new(SystemClock));

    // The internal face is the local application endpoint; management and
    // socket transports attach through the same ingress channel.
    let (internal, _app_rx) = InternalTransport::pair();
    let internal_face = forwarder.add_face(FaceScope::Local, Box::new(internal));
    info!("internal face ready: {}", internal_face);

    for route in &cli.route {
        let (prefix, face) = route
            .split_once('=')
            .with_context(|| format!("invalid route {:?}, expected prefix=faceId", route))?;
        let face_id = face
            .parse::<u64>()
            .with_context(|| format!("invalid face id in route {:?}", route))?;
        forwarder.add_route(
            &Name::from_string(prefix),
            rust_ndnfw_daemon::face::FaceId::new(face_id),
            0,
        );
    }

    let (event_loop, ingress) = EventLoop::new(forwarder);
    // Keep the ingress side alive for transports; the loop stops when every
    // sender is gone or on Ctrl-C.
    let _ingress: tokio::sync::mpsc::Sender<PacketIn> = ingress;

    tokio::select! {
        _ = event_loop.run() => {
            info!("event loop finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
