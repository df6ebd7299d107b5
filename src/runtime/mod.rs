use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{ContainerDetails, ContainerEvent};

pub mod docker;
pub use docker::DockerRuntime;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ids of every currently running container.
    async fn list_running(&self) -> Result<Vec<String>>;

    /// Current network configuration of a container.
    async fn inspect(&self, id: &str) -> Result<ContainerDetails>;

    /// Subscribe to lifecycle events and forward them, in delivery
    /// order, to `event_tx`.  Returns `Ok` when the stream ends or the
    /// receiver goes away, and a `Stream` error when the subscription
    /// fails.
    async fn watch(&self, event_tx: mpsc::Sender<ContainerEvent>) -> Result<()>;
}
