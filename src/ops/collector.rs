//! Multi-scope paginated collection.
//!
//! Merges list results from every scope in a resolved set into one
//! sequence: first pages of all scopes are fetched up front so a bad scope
//! fails before any draining work, then each scope's continuation token is
//! exhausted scope by scope. Results stay grouped by scope in resolution
//! order, server order within a scope.

use super::error::{OpsError, ScopeFailure};
use super::scope::{Scope, ScopeSet};
use serde_json::Value;
use std::future::Future;

/// One page of list results from a single scope.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub next_page_token: Option<String>,
}

/// Continuation token bound to the scope it came from. A cursor from one
/// scope is never replayed against another.
#[derive(Debug, Clone)]
pub struct PageCursor {
    pub scope: Scope,
    pub token: String,
}

/// Failure policy when one scope's pages cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// A failed scope fails the whole collection with an aggregate error
    /// (gathered items are carried in the error, not discarded).
    Strict,
    /// Failed scopes become warnings; the partial sequence is returned.
    BestEffort,
}

/// The merged sequence plus any non-fatal per-scope warnings.
#[derive(Debug, Default)]
pub struct CollectOutput {
    pub items: Vec<Value>,
    pub warnings: Vec<String>,
}

struct ScopeState {
    scope: Scope,
    items: Vec<Value>,
    cursor: Option<PageCursor>,
    failure: Option<OpsError>,
}

/// Collect every item of a resource type across a scope set.
///
/// `list_fn(scope, page_token)` fetches one page; a `None` continuation in
/// the returned page ends that scope. The output sequence is single-use -
/// collecting again means calling again.
pub async fn collect<F, Fut>(
    scope_set: &ScopeSet,
    mode: CollectMode,
    list_fn: F,
) -> Result<CollectOutput, OpsError>
where
    F: Fn(Scope, Option<String>) -> Fut,
    Fut: Future<Output = Result<ListPage, OpsError>>,
{
    let mut states: Vec<ScopeState> = Vec::with_capacity(scope_set.len());

    // First pages for every scope before draining any of them.
    for scope in scope_set.iter() {
        let mut state = ScopeState {
            scope: scope.clone(),
            items: Vec::new(),
            cursor: None,
            failure: None,
        };
        match list_fn(scope.clone(), None).await {
            Ok(page) => {
                state.items = page.items;
                state.cursor = page.next_page_token.map(|token| PageCursor {
                    scope: scope.clone(),
                    token,
                });
            }
            Err(err) => {
                tracing::warn!("listing {} failed: {}", scope, err);
                state.failure = Some(err);
            }
        }
        states.push(state);
    }

    // Drain remaining pages scope by scope.
    for state in &mut states {
        if state.failure.is_some() {
            continue;
        }
        while let Some(cursor) = state.cursor.take() {
            debug_assert_eq!(cursor.scope, state.scope);
            match list_fn(cursor.scope.clone(), Some(cursor.token)).await {
                Ok(page) => {
                    state.items.extend(page.items);
                    state.cursor = page.next_page_token.map(|token| PageCursor {
                        scope: state.scope.clone(),
                        token,
                    });
                }
                Err(err) => {
                    // Pages already gathered for this scope are kept.
                    tracing::warn!("listing {} failed mid-drain: {}", state.scope, err);
                    state.failure = Some(err);
                }
            }
        }
    }

    let mut items = Vec::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    for state in states {
        if let Some(err) = state.failure {
            warnings.push(format!("{}: {}", state.scope, err));
            failures.push(ScopeFailure {
                scope: state.scope,
                cause: Box::new(err),
            });
        }
        items.extend(state.items);
    }

    if !failures.is_empty() && mode == CollectMode::Strict {
        return Err(OpsError::Collect {
            failures,
            partial: items,
        });
    }

    Ok(CollectOutput { items, warnings })
}
