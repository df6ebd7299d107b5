//! Data structures shared between the runtime adapter, the resolver and
//! the hosts-file reconciler.
//!
//! Everything here is runtime-neutral: the Docker adapter translates
//! its API models into these types so the reconciliation logic never
//! sees `bollard` structs.

use std::collections::{BTreeMap, BTreeSet};

/// One network attachment of one container, as it appears in the hosts
/// file.
///
/// `aliases` is a set: duplicates collapse and iteration order is
/// sorted, which keeps rendered lines reproducible.  The order of names
/// within a line carries no meaning for resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub ip: String,
    pub owner_name: String,
    pub aliases: BTreeSet<String>,
}

/// All records registered for a single container.
pub type ContainerAddresses = Vec<AddressRecord>;

/// Container id → records.  A `BTreeMap` keeps the rendered line order
/// stable for a fixed registry state.
pub type Registry = BTreeMap<String, ContainerAddresses>;

/// Per-network settings of an attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAttachment {
    pub ip: String,
    pub aliases: Vec<String>,
}

/// The subset of an inspected container that address resolution needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDetails {
    pub hostname: String,
    /// Container name without the leading `/`.
    pub display_name: String,
    pub networks: BTreeMap<String, NetworkAttachment>,
    /// Top-level address of the default bridge; empty when absent.
    pub legacy_ip: String,
}

/// Category of a runtime event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Container,
    Other(String),
}

/// A lifecycle event delivered by the runtime's event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEvent {
    pub kind: EventKind,
    pub action: String,
    pub actor_id: String,
}

impl ContainerEvent {
    pub fn container(action: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Container,
            action: action.into(),
            actor_id: actor_id.into(),
        }
    }
}
