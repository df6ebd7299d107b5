//! Hoster daemon entry point.

use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod config;
mod error;
mod hosts;
mod reconciler;
mod resolver;
mod runtime;
mod types;

use config::{Cli, Config};
use hosts::HostsFile;
use reconciler::HostsReconciler;
use resolver::AddressResolver;
use runtime::{ContainerRuntime, DockerRuntime};

/// Events buffered while the reconciler is busy rendering.
const EVENT_BUFFER: usize = 128;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --help and --version exit here, before any reconciliation.
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::load(&cli)?;
    info!("Starting Hoster with config: {:?}", cfg);

    // Graceful Shutdown: handlers exist before the file is first touched.
    let cancel = CancellationToken::new();
    let signals = ShutdownSignals::install()?;
    let signal_handle = tokio::spawn(signals.wait(cancel.clone()));

    let runtime = Arc::new(DockerRuntime::connect(&cfg.docker_socket).await?);

    // Subscribe before listing so events raised while seeding are queued.
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let runtime_for_watch = Arc::clone(&runtime);
    let watch_handle = tokio::spawn(async move { runtime_for_watch.watch(event_tx).await });

    let mut reconciler = HostsReconciler::new(
        AddressResolver::new(Arc::clone(&runtime)),
        HostsFile::new(cfg.hosts_path.clone()),
    );
    let running = runtime.list_running().await?;
    reconciler.seed(&running).await;
    info!("Tracking {} container(s)", reconciler.registry().len());
    reconciler.render().await?;

    reconciler.run(event_rx, cancel.clone()).await;

    let outcome = if cancel.is_cancelled() {
        watch_handle.abort();
        Ok(())
    } else {
        match watch_handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Container runtime failed: {}", e);
                Err(anyhow::Error::from(e))
            }
            Err(e) => Err(anyhow::anyhow!("Docker watcher task failed: {}", e)),
        }
    };
    signal_handle.abort();

    // The event loop has halted, so this is the last write to the file.
    reconciler.shutdown().await;

    info!("Shutdown complete.");
    outcome
}

/// SIGINT and SIGTERM streams.  Once installed, a signal is queued
/// until [`ShutdownSignals::wait`] observes it.
struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Cancel `cancel` on the first SIGINT or SIGTERM.
    async fn wait(mut self, cancel: CancellationToken) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("Received SIGINT, shutting down..."),
            _ = self.terminate.recv() => info!("Received SIGTERM, shutting down..."),
        }
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_before_wait_is_not_lost() {
        let signals = ShutdownSignals::install().unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let cancel = CancellationToken::new();
        tokio::time::timeout(Duration::from_secs(5), signals.wait(cancel.clone()))
            .await
            .expect("queued SIGTERM should be observed");
        assert!(cancel.is_cancelled());
    }
}
