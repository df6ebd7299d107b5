use super::ContainerRuntime;
use crate::error::{HosterError, Result};
use crate::types::{ContainerDetails, ContainerEvent, EventKind, NetworkAttachment};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerInspectResponse, EventMessage, EventMessageTypeEnum};
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use futures_util::stream::StreamExt;
use log::{debug, info};
use tokio::sync::mpsc;

/// Seconds before a request to the daemon times out.
const REQUEST_TIMEOUT: u64 = 120;

/// Actions the hosts file reacts to.
const LIFECYCLE_ACTIONS: [&str; 4] = ["start", "stop", "die", "destroy"];

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the daemon listening on the unix socket at `socket`
    /// and negotiate the API version.
    pub async fn connect(socket: &str) -> Result<Self> {
        let connect_err = |source| HosterError::Connect {
            socket: socket.to_string(),
            source,
        };
        let docker = Docker::connect_with_unix(socket, REQUEST_TIMEOUT, API_DEFAULT_VERSION)
            .map_err(connect_err)?
            .negotiate_version()
            .await
            .map_err(connect_err)?;
        info!("Connected to Docker at {}", socket);
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running(&self) -> Result<Vec<String>> {
        let opts = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(opts))
            .await
            .map_err(HosterError::Listing)?;

        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails> {
        let detail = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|source| HosterError::Inspection {
                id: id.to_string(),
                source,
            })?;
        Ok(details_from_inspect(detail))
    }

    async fn watch(&self, event_tx: mpsc::Sender<ContainerEvent>) -> Result<()> {
        let opts = EventsOptions::<String> {
            filters: [
                ("type", ["container"].as_slice()),
                ("event", LIFECYCLE_ACTIONS.as_slice()),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect(),
            ..Default::default()
        };

        let mut stream = self.docker.events(Some(opts));

        info!("Listening for Docker events...");
        while let Some(msg) = stream.next().await {
            let message = msg.map_err(HosterError::Stream)?;
            let Some(event) = event_from_message(message) else {
                continue;
            };
            debug!("Container event: {} for {}", event.action, event.actor_id);
            if event_tx.send(event).await.is_err() {
                debug!("Event receiver closed, stopping Docker watcher");
                return Ok(());
            }
        }

        info!("Docker event stream ended");
        Ok(())
    }
}

/// Translate an inspect response into the runtime-neutral view.
///
/// An attachment with an empty IPv4 address falls back to its global
/// IPv6 address; the same applies to the top-level bridge address.
fn details_from_inspect(detail: ContainerInspectResponse) -> ContainerDetails {
    let hostname = detail
        .config
        .and_then(|c| c.hostname)
        .unwrap_or_default();
    let name = detail.name.unwrap_or_default();
    let display_name = name.strip_prefix('/').unwrap_or(&name).to_string();

    let settings = detail.network_settings.unwrap_or_default();
    let legacy_ip = pick_ip(settings.ip_address, settings.global_ipv6_address);
    let networks = settings
        .networks
        .unwrap_or_default()
        .into_iter()
        .map(|(name, endpoint)| {
            let attachment = NetworkAttachment {
                ip: pick_ip(endpoint.ip_address, endpoint.global_ipv6_address),
                aliases: endpoint.aliases.unwrap_or_default(),
            };
            (name, attachment)
        })
        .collect();

    ContainerDetails {
        hostname,
        display_name,
        networks,
        legacy_ip,
    }
}

fn pick_ip(ipv4: Option<String>, ipv6: Option<String>) -> String {
    ipv4.filter(|ip| !ip.is_empty())
        .or_else(|| ipv6.filter(|ip| !ip.is_empty()))
        .unwrap_or_default()
}

fn event_from_message(message: EventMessage) -> Option<ContainerEvent> {
    let actor_id = message.actor.and_then(|a| a.id).unwrap_or_default();
    if actor_id.is_empty() {
        return None;
    }
    let action = message.action.unwrap_or_default();
    let event = match message.typ {
        Some(EventMessageTypeEnum::CONTAINER) => ContainerEvent::container(action, actor_id),
        other => ContainerEvent {
            kind: EventKind::Other(other.map(|t| t.to_string()).unwrap_or_default()),
            action,
            actor_id,
        },
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, EndpointSettings, EventActor, NetworkSettings};
    use std::collections::HashMap;

    fn endpoint(ip: &str, ipv6: &str, aliases: Option<Vec<&str>>) -> EndpointSettings {
        EndpointSettings {
            ip_address: Some(ip.to_string()),
            global_ipv6_address: Some(ipv6.to_string()),
            aliases: aliases.map(|a| a.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_details_from_inspect() {
        let mut networks = HashMap::new();
        networks.insert("net1".to_string(), endpoint("172.20.0.5", "", Some(vec!["api"])));
        networks.insert("v6only".to_string(), endpoint("", "fd00::5", None));

        let detail = ContainerInspectResponse {
            name: Some("/web".to_string()),
            config: Some(ContainerConfig {
                hostname: Some("web-1".to_string()),
                ..Default::default()
            }),
            network_settings: Some(NetworkSettings {
                ip_address: Some("172.17.0.2".to_string()),
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        };

        let details = details_from_inspect(detail);
        assert_eq!(details.display_name, "web");
        assert_eq!(details.hostname, "web-1");
        assert_eq!(details.legacy_ip, "172.17.0.2");
        assert_eq!(details.networks["net1"].ip, "172.20.0.5");
        assert_eq!(details.networks["net1"].aliases, vec!["api".to_string()]);
        assert_eq!(details.networks["v6only"].ip, "fd00::5");
        assert!(details.networks["v6only"].aliases.is_empty());
    }

    #[test]
    fn test_details_from_empty_inspect() {
        let details = details_from_inspect(ContainerInspectResponse::default());
        assert_eq!(details, ContainerDetails::default());
    }

    #[test]
    fn test_event_from_message() {
        let message = EventMessage {
            typ: Some(EventMessageTypeEnum::CONTAINER),
            action: Some("start".to_string()),
            actor: Some(EventActor {
                id: Some("abc123".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            event_from_message(message),
            Some(ContainerEvent::container("start", "abc123"))
        );

        let network_event = EventMessage {
            typ: Some(EventMessageTypeEnum::NETWORK),
            action: Some("connect".to_string()),
            actor: Some(EventActor {
                id: Some("net".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let event = event_from_message(network_event).unwrap();
        assert_ne!(event.kind, EventKind::Container);

        assert_eq!(event_from_message(EventMessage::default()), None);
    }
}
