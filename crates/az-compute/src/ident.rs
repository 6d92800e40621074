//! Builds and parses the structured resource identifiers handed to the
//! orchestrator. Identifiers are opaque to every other module; only this
//! one knows their internal layout.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DELIMITER: char = '/';

/// Opaque instance identifier,
/// `/subscriptions/<sub>/resourceGroups/<group>/providers/<namespace>/<collection>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The tenant context a resource name is meaningful in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ResourceScope {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }
}

/// Resource collections this plugin addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    VirtualMachine,
    NetworkInterface,
}

impl ResourceKind {
    fn segments(self) -> (&'static str, &'static str) {
        match self {
            Self::VirtualMachine => ("Microsoft.Compute", "virtualMachines"),
            Self::NetworkInterface => ("Microsoft.Network", "networkInterfaces"),
        }
    }

    fn from_segments(namespace: &str, collection: &str) -> Option<Self> {
        match (namespace, collection) {
            ("Microsoft.Compute", "virtualMachines") => Some(Self::VirtualMachine),
            ("Microsoft.Network", "networkInterfaces") => Some(Self::NetworkInterface),
            _ => None,
        }
    }
}

pub fn build_virtual_machine_id(scope: &ResourceScope, name: &str) -> ResourceId {
    build(scope, ResourceKind::VirtualMachine, name)
}

pub fn build_network_interface_id(scope: &ResourceScope, name: &str) -> ResourceId {
    build(scope, ResourceKind::NetworkInterface, name)
}

fn build(scope: &ResourceScope, kind: ResourceKind, name: &str) -> ResourceId {
    let (namespace, collection) = kind.segments();
    ResourceId(format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{namespace}/{collection}/{}",
        escape(&scope.subscription_id),
        escape(&scope.resource_group),
        escape(name),
    ))
}

/// Split an identifier back into scope, kind and resource name. Any
/// deviation from the layout `build` produces is malformed; identifiers
/// are never partially decoded.
pub fn parse(id: &ResourceId) -> Result<(ResourceScope, ResourceKind, String)> {
    let parts: Vec<&str> = id.0.split(DELIMITER).collect();
    match parts.as_slice() {
        ["", "subscriptions", sub, "resourceGroups", group, "providers", namespace, collection, name] => {
            let kind = ResourceKind::from_segments(namespace, collection).ok_or_else(|| {
                Error::MalformedIdentifier(format!("unknown resource kind in {}", id.0))
            })?;
            Ok((
                ResourceScope::new(unescape(sub), unescape(group)),
                kind,
                unescape(name),
            ))
        }
        _ => Err(Error::MalformedIdentifier(id.0.clone())),
    }
}

// '%' must be escaped before '/' so unescaping in the reverse order
// round-trips.
fn escape(segment: &str) -> String {
    segment.replace('%', "%25").replace(DELIMITER, "%2F")
}

fn unescape(segment: &str) -> String {
    segment.replace("%2F", "/").replace("%25", "%")
}
