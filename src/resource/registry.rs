//! Resource Registry - Load resource definitions from JSON
//!
//! This module loads all resource type definitions from embedded JSON
//! files and provides lookup functions for the rest of the application.

use crate::ops::scope::ScopeKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[
    include_str!("../resources/compute.json"),
    include_str!("../resources/network.json"),
];

/// Column definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDef {
    pub header: String,
    pub json_path: String,
    pub width: usize,
}

fn default_id_field() -> String {
    "name".to_string()
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub display_name: String,
    pub service: String,
    /// REST collection name used in URL paths
    pub collection: String,
    pub scope_kind: ScopeKind,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    pub columns: Vec<ColumnDef>,
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: HashMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        final_config
    })
}

/// Get a resource definition by key
pub fn get_resource(key: &str) -> Option<&'static ResourceDef> {
    get_registry().resources.get(key)
}

/// Get all resource keys, sorted for stable help output
pub fn get_all_resource_keys() -> Vec<&'static str> {
    let mut keys: Vec<&str> = get_registry().resources.keys().map(|s| s.as_str()).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(
            !registry.resources.is_empty(),
            "Registry should have resources"
        );
    }

    #[test]
    fn test_instances_resource_exists() {
        let resource = get_resource("instances");
        assert!(resource.is_some(), "Instances resource should exist");

        let resource = resource.unwrap();
        assert_eq!(resource.display_name, "VM instances");
        assert_eq!(resource.service, "compute");
        assert_eq!(resource.scope_kind, ScopeKind::Zonal);
    }

    #[test]
    fn test_every_scope_kind_is_represented() {
        let registry = get_registry();
        for kind in [ScopeKind::Zonal, ScopeKind::Regional, ScopeKind::Global] {
            assert!(
                registry.resources.values().any(|r| r.scope_kind == kind),
                "no resource with scope kind {kind:?}"
            );
        }
    }

    #[test]
    fn test_get_all_resource_keys_is_sorted() {
        let keys = get_all_resource_keys();
        assert!(!keys.is_empty(), "Should have resource types");
        assert!(keys.contains(&"instances"), "Should contain instances");
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }
}
