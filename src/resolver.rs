//! Derivation of hosts-file records from a container's network settings.
//!
//! Each attachment that declares at least one network alias becomes a
//! record whose names are the declared aliases plus the container name
//! and hostname.  Attachments without aliases only give bare
//! connectivity and produce nothing.  A non-empty top-level bridge
//! address always adds one more record carrying just the container name
//! and hostname.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::Result;
use crate::runtime::ContainerRuntime;
use crate::types::{AddressRecord, ContainerAddresses, ContainerDetails};

pub struct AddressResolver<R> {
    runtime: Arc<R>,
}

impl<R: ContainerRuntime> AddressResolver<R> {
    pub fn new(runtime: Arc<R>) -> Self {
        Self { runtime }
    }

    /// Inspect `container_id` and derive its records.
    pub async fn resolve(&self, container_id: &str) -> Result<ContainerAddresses> {
        let details = self.runtime.inspect(container_id).await?;
        Ok(addresses_from_details(&details))
    }
}

pub fn addresses_from_details(details: &ContainerDetails) -> ContainerAddresses {
    let mut records = Vec::new();

    for attachment in details.networks.values() {
        if attachment.aliases.is_empty() || attachment.ip.is_empty() {
            continue;
        }
        let aliases = alias_set(
            attachment
                .aliases
                .iter()
                .map(String::as_str)
                .chain([details.display_name.as_str(), details.hostname.as_str()]),
        );
        records.push(AddressRecord {
            ip: attachment.ip.clone(),
            owner_name: details.display_name.clone(),
            aliases,
        });
    }

    if !details.legacy_ip.is_empty() {
        records.push(AddressRecord {
            ip: details.legacy_ip.clone(),
            owner_name: details.display_name.clone(),
            aliases: alias_set([details.display_name.as_str(), details.hostname.as_str()]),
        });
    }

    // A record must be reachable by at least one name.
    records.retain(|r| !r.aliases.is_empty());
    records
}

fn alias_set<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkAttachment;

    fn details(name: &str, hostname: &str, legacy_ip: &str) -> ContainerDetails {
        ContainerDetails {
            hostname: hostname.to_string(),
            display_name: name.to_string(),
            legacy_ip: legacy_ip.to_string(),
            ..Default::default()
        }
    }

    fn attach(details: &mut ContainerDetails, network: &str, ip: &str, aliases: &[&str]) {
        details.networks.insert(
            network.to_string(),
            NetworkAttachment {
                ip: ip.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            },
        );
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_network_aliases_include_name_and_hostname() {
        let mut web = details("web", "web-1", "");
        attach(&mut web, "net1", "172.20.0.3", &["api"]);

        let records = addresses_from_details(&web);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ip, "172.20.0.3");
        assert_eq!(records[0].owner_name, "web");
        assert_eq!(records[0].aliases, names(&["web", "web-1", "api"]));
    }

    #[test]
    fn test_attachment_without_aliases_is_skipped() {
        let mut web = details("web", "web-1", "");
        attach(&mut web, "plain", "172.21.0.3", &[]);
        attach(&mut web, "net1", "172.20.0.3", &["api"]);

        let records = addresses_from_details(&web);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ip, "172.20.0.3");
    }

    #[test]
    fn test_legacy_ip_always_added() {
        let mut db = details("db", "db", "172.17.0.4");
        attach(&mut db, "backend", "172.22.0.2", &["db", "postgres"]);

        let records = addresses_from_details(&db);
        assert_eq!(records.len(), 2);
        let legacy = records.iter().find(|r| r.ip == "172.17.0.4").unwrap();
        assert_eq!(legacy.aliases, names(&["db"]));
        let backend = records.iter().find(|r| r.ip == "172.22.0.2").unwrap();
        assert_eq!(backend.aliases, names(&["db", "postgres"]));
    }

    #[test]
    fn test_no_address_yields_nothing() {
        let mut idle = details("idle", "idle-host", "");
        attach(&mut idle, "none", "", &["idle"]);
        assert!(addresses_from_details(&idle).is_empty());
    }

    #[test]
    fn test_empty_hostname_not_an_alias() {
        let records = addresses_from_details(&details("solo", "", "10.0.0.9"));
        assert_eq!(records[0].aliases, names(&["solo"]));
    }
}
