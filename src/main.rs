//! tandem - collaborative graph editing over last-writer-wins CRDTs.
//!
//! ```text
//! tandem hub [config.toml]      run the relay hub
//! tandem client [config.toml]   edit the shared graph from stdin
//! ```

use std::sync::Arc;
use tandem::config::{self, Config};
use tandem::hub::Hub;
use tandem::model::Outcome;
use tandem::session::Session;
use tandem::telemetry::{self, spans};
use tandem::transport::tcp::{TcpPublisher, TcpSnapshot, TcpSubscriber};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "client".to_string());

    let config = match args.next() {
        Some(path) => Config::load(&path).map_err(|e| {
            eprintln!("failed to load {path}: {e}");
            e
        })?,
        None => Config::default(),
    };

    telemetry::init(&config.log);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    match mode.as_str() {
        "hub" => run_hub(&config).await,
        "client" => run_client(&config).await,
        other => anyhow::bail!("unknown mode `{other}` (expected `hub` or `client`)"),
    }
}

async fn run_hub(config: &Config) -> anyhow::Result<()> {
    let hub = Hub::bind(&config.hub).await?;
    info!(id = %config.hub.id, "Starting tandem hub");

    tokio::select! {
        () = hub.run() => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutting down hub");
        }
    }
    Ok(())
}

async fn run_client(config: &Config) -> anyhow::Result<()> {
    let identity = config.replica.identity();
    let span = spans::replica(identity.as_str());
    let hub = &config.hub;

    async move {
        let publisher = TcpPublisher::connect(hub.publish, hub.topic.as_str()).await?;
        let session = Arc::new(Session::from_config(
            identity,
            &config.session,
            Arc::new(publisher),
        ));
        info!(id = %session.identity(), "Starting tandem client");

        let mut subscriber = TcpSubscriber::connect(hub.subscribe, hub.topic.as_str()).await?;
        let live = Arc::clone(&session);
        tokio::spawn(
            async move {
                live.run_live(&mut subscriber).await;
            }
            .in_current_span(),
        );

        // The join runs alongside live input; it never blocks the prompt.
        let joining = Arc::clone(&session);
        let snapshot_addr = hub.snapshot;
        tokio::spawn(
            async move {
                match TcpSnapshot::connect(snapshot_addr).await {
                    Ok(mut source) => {
                        joining.join(&mut source).await;
                    }
                    Err(e) => warn!(error = %e, "Snapshot endpoint unreachable"),
                }
            }
            .in_current_span(),
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                res = tokio::signal::ctrl_c() => {
                    res?;
                    None
                }
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match session.submit(&line).await {
                Ok(Outcome::Applied) => {}
                Ok(Outcome::Stale) => println!("rejected"),
                Ok(Outcome::Output(text)) => println!("{text}"),
                Ok(Outcome::NotFound(id)) => println!("{id}: not found"),
                Err(e) if e.is_user_error() => println!("rejected: {e}"),
                Err(e) => return Err(e.into()),
            }
        }
        info!("Shutting down client");
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
