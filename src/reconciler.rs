//! Keeps the registry of container addresses and the hosts file in step
//! with container lifecycle events.
//!
//! The reconciler is driven by a single task: events are handled one at
//! a time in delivery order, so the registry needs no locking.  Every
//! state change is followed by exactly one render.  A failed render is
//! reported and not retried; the registry already holds the intended
//! state and the next event writes it out.

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::hosts::HostsFile;
use crate::resolver::AddressResolver;
use crate::runtime::ContainerRuntime;
use crate::types::{ContainerEvent, EventKind, Registry};

pub struct HostsReconciler<R> {
    resolver: AddressResolver<R>,
    hosts: HostsFile,
    registry: Registry,
}

impl<R: ContainerRuntime> HostsReconciler<R> {
    pub fn new(resolver: AddressResolver<R>, hosts: HostsFile) -> Self {
        Self {
            resolver,
            hosts,
            registry: Registry::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve every container in `container_ids` into the registry.
    ///
    /// Containers that cannot be inspected are logged and skipped.  No
    /// render happens here; the caller renders once after seeding.
    pub async fn seed(&mut self, container_ids: &[String]) {
        for id in container_ids {
            match self.resolver.resolve(id).await {
                Ok(addresses) => {
                    self.registry.insert(id.clone(), addresses);
                }
                Err(e) => {
                    warn!("Skipping container {}: {}", id, e);
                }
            }
        }
        info!(
            "Seeded {} of {} running container(s)",
            self.registry.len(),
            container_ids.len()
        );
    }

    pub async fn on_start(&mut self, container_id: &str) -> Result<()> {
        let addresses = match self.resolver.resolve(container_id).await {
            Ok(addresses) => addresses,
            Err(e) => {
                warn!("Error getting container data: {}", e);
                return Ok(());
            }
        };
        info!(
            "Container started: {} ({} address(es))",
            container_id,
            addresses.len()
        );
        self.registry.insert(container_id.to_string(), addresses);
        self.render().await
    }

    /// Drop a container's records.  Unknown ids are ignored without a
    /// render, so repeated stop/die/destroy events are harmless.
    pub async fn on_stop(&mut self, container_id: &str) -> Result<()> {
        if self.registry.remove(container_id).is_none() {
            debug!("Ignoring stop for untracked container {}", container_id);
            return Ok(());
        }
        info!("Container stopped: {}", container_id);
        self.render().await
    }

    pub async fn render(&self) -> Result<()> {
        self.hosts.render(&self.registry).await
    }

    /// Clear the registry and remove the managed section.  Failures are
    /// logged only; the process is exiting either way.
    pub async fn shutdown(&mut self) {
        self.registry.clear();
        if let Err(e) = self.render().await {
            error!("Error cleaning up hosts file: {}", e);
        } else {
            info!("Removed managed entries from {}", self.hosts.path().display());
        }
    }

    pub async fn handle_event(&mut self, event: ContainerEvent) {
        if let EventKind::Other(category) = &event.kind {
            debug!("Ignoring {} event {}", category, event.action);
            return;
        }
        let outcome = match event.action.as_str() {
            "start" => self.on_start(&event.actor_id).await,
            "stop" | "die" | "destroy" => self.on_stop(&event.actor_id).await,
            _ => return,
        };
        if let Err(e) = outcome {
            error!("Error updating hosts file: {}", e);
        }
    }

    /// Consume events until the channel closes or `cancel` fires.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<ContainerEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stopping event loop");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                },
            }
        }
    }
}
