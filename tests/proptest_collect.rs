//! Property-based tests for scope resolution and multi-scope collection.
//!
//! These verify the merge/ordering guarantees of the collector and the
//! resolver's validation behavior against randomized scope layouts and
//! page partitions.

use cloudctl::ops::collector::{collect, CollectMode, ListPage};
use cloudctl::ops::error::OpsError;
use cloudctl::ops::scope::{resolve_scopes, ScopeKind};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;

/// A zone name like "us-central1-a".
fn arb_zone() -> impl Strategy<Value = String> {
    ("[a-z]{2,4}", "[a-z]{4,8}[1-4]", "[a-f]")
        .prop_map(|(geo, area, letter)| format!("{geo}-{area}-{letter}"))
}

/// Distinct zones, each with its own list of item names.
fn arb_zone_layout() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    prop::collection::btree_map(arb_zone(), prop::collection::vec("[a-z0-9-]{1,12}", 0..12), 1..5)
        .prop_map(|m| m.into_iter().collect())
}

/// Split one zone's items into pages of the given size, chaining
/// continuation tokens.
fn paginate(zone: &str, items: &[String], page_size: usize) -> Vec<ListPage> {
    let chunks: Vec<&[String]> = if items.is_empty() {
        vec![&items[..]]
    } else {
        items.chunks(page_size.max(1)).collect()
    };
    let last = chunks.len() - 1;
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| ListPage {
            items: chunk.iter().map(|name| json!({ "name": name })).collect(),
            next_page_token: if i == last {
                None
            } else {
                Some(format!("{zone}:{}", i + 1))
            },
        })
        .collect()
}

fn collect_layout(
    layout: &[(String, Vec<String>)],
    page_size: usize,
) -> Result<Vec<Value>, OpsError> {
    let zones: Vec<String> = layout.iter().map(|(z, _)| z.clone()).collect();
    let pages: HashMap<String, Vec<ListPage>> = layout
        .iter()
        .map(|(zone, items)| (zone.clone(), paginate(zone, items, page_size)))
        .collect();

    tokio_test::block_on(async {
        let lookup_zones = zones.clone();
        let scope_set = resolve_scopes(ScopeKind::Zonal, &[], || async move { Ok(lookup_zones) })
            .await?;
        let out = collect(&scope_set, CollectMode::Strict, |scope, token| {
            let pages = &pages;
            async move {
                let zone_pages = &pages[scope.name()];
                let index = match token.as_deref() {
                    None => 0,
                    Some(token) => {
                        let (zone, index) = token.split_once(':').expect("malformed token");
                        assert_eq!(zone, scope.name(), "cursor crossed scopes");
                        index.parse::<usize>().unwrap()
                    }
                };
                Ok(zone_pages[index].clone())
            }
        })
        .await?;
        Ok(out.items)
    })
}

proptest! {
    /// Collection returns the exact union of every zone's items - no
    /// duplicates, no omissions - grouped in zone order.
    #[test]
    fn union_of_scopes_is_exact(layout in arb_zone_layout(), page_size in 1usize..5) {
        let collected = collect_layout(&layout, page_size).unwrap();
        let got: Vec<String> = collected
            .iter()
            .map(|v| v["name"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = layout
            .iter()
            .flat_map(|(_, items)| items.iter().cloned())
            .collect();
        prop_assert_eq!(got, expected);
    }

    /// The merged sequence is independent of how the backend happened to
    /// partition pages.
    #[test]
    fn page_partitioning_does_not_change_results(
        layout in arb_zone_layout(),
        size_a in 1usize..5,
        size_b in 1usize..5,
    ) {
        let a = collect_layout(&layout, size_a).unwrap();
        let b = collect_layout(&layout, size_b).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Resolving explicit scope names that are all known returns exactly
    /// those scopes, in request order.
    #[test]
    fn known_subset_resolves_to_itself(layout in arb_zone_layout()) {
        let known: Vec<String> = layout.iter().map(|(z, _)| z.clone()).collect();
        let requested = vec![known[0].clone()];
        let set = tokio_test::block_on(resolve_scopes(ScopeKind::Zonal, &requested, || {
            let known = known.clone();
            async move { Ok(known) }
        }))
        .unwrap();
        prop_assert_eq!(set.len(), 1);
        prop_assert_eq!(set.scopes()[0].name(), requested[0].as_str());
    }

    /// A scope name outside the known set always fails resolution, naming
    /// the offender.
    #[test]
    fn unknown_scope_always_rejected(layout in arb_zone_layout(), suffix in "[a-z]{4}") {
        let known: Vec<String> = layout.iter().map(|(z, _)| z.clone()).collect();
        let bogus = format!("nowhere-{suffix}-z");
        prop_assume!(!known.contains(&bogus));

        let requested = vec![bogus.clone()];
        let err = tokio_test::block_on(resolve_scopes(ScopeKind::Zonal, &requested, || {
            let known = known.clone();
            async move { Ok(known) }
        }))
        .unwrap_err();
        match err {
            OpsError::UnknownScope { scope, .. } => prop_assert_eq!(scope, bogus),
            other => prop_assert!(false, "expected UnknownScope, got {other:?}"),
        }
    }
}
