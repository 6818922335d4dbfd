//! Scopes and scope resolution.
//!
//! A scope is the namespace dimension a resource lives in: a zone, a
//! region, or the project-global namespace. Every listing and every
//! mutation is confined to a resolved set of scopes.

use super::error::OpsError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;

/// The scoping dimension of a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Global,
    Regional,
    Zonal,
}

impl ScopeKind {
    /// Build the concrete scope for a name of this kind.
    pub fn scope_for(self, name: &str) -> Scope {
        match self {
            ScopeKind::Global => Scope::Global,
            ScopeKind::Regional => Scope::Region(name.to_string()),
            ScopeKind::Zonal => Scope::Zone(name.to_string()),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global scope"),
            ScopeKind::Regional => write!(f, "region"),
            ScopeKind::Zonal => write!(f, "zone"),
        }
    }
}

/// One namespace a resource or list query is confined to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Region(String),
    Zone(String),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Region(_) => ScopeKind::Regional,
            Scope::Zone(_) => ScopeKind::Zonal,
        }
    }

    /// The scope's short name ("global" for the global scope).
    pub fn name(&self) -> &str {
        match self {
            Scope::Global => "global",
            Scope::Region(name) | Scope::Zone(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Region(name) => write!(f, "region {}", name),
            Scope::Zone(name) => write!(f, "zone {}", name),
        }
    }
}

/// Identifies one target resource: type tag, name, and owning scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub resource_type: String,
    pub name: String,
    pub scope: Scope,
}

impl ResourceRef {
    pub fn new(resource_type: &str, name: &str, scope: Scope) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            scope,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.resource_type, self.name, self.scope)
    }
}

/// The resolved, non-empty collection of scopes an invocation touches.
#[derive(Debug, Clone)]
pub struct ScopeSet {
    scopes: Vec<Scope>,
}

impl ScopeSet {
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }
}

/// Resolve the scopes a command run must touch.
///
/// `lookup` enumerates every known scope name of the kind (a backend call);
/// it is consulted when `requested` is empty (meaning "all scopes") and to
/// validate explicitly requested names. The result is never cached across
/// invocations - each run resolves fresh.
///
/// Global resources resolve to the single global scope regardless of input.
pub async fn resolve_scopes<F, Fut>(
    kind: ScopeKind,
    requested: &[String],
    lookup: F,
) -> Result<ScopeSet, OpsError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<String>, OpsError>>,
{
    if kind == ScopeKind::Global {
        return Ok(ScopeSet {
            scopes: vec![Scope::Global],
        });
    }

    let known = lookup().await?;

    if requested.is_empty() {
        if known.is_empty() {
            return Err(OpsError::NoScopes(kind));
        }
        return Ok(ScopeSet {
            scopes: known.iter().map(|name| kind.scope_for(name)).collect(),
        });
    }

    let known_names: HashSet<&str> = known.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut scopes = Vec::with_capacity(requested.len());
    for name in requested {
        if !known_names.contains(name.as_str()) {
            return Err(OpsError::UnknownScope {
                kind,
                scope: name.clone(),
            });
        }
        if seen.insert(name.as_str()) {
            scopes.push(kind.scope_for(name));
        }
    }

    Ok(ScopeSet { scopes })
}
