// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure presence reducer.
//!
//! Joins and leaves are applied as pure functions over an immutable table.
//! Both sides of a diff are computed against the same pre-diff snapshot and
//! merged with leave results taking precedence, so a join and a leave for
//! the same key in one diff resolves to whatever the leave computed.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::{PresenceDiff, PresenceKey, PresenceMeta, PresenceTable};

/// Append joiners' metas to the table, inserting keys as needed.
///
/// Metas are never deduplicated by content; distinct sessions may
/// coincidentally share fields and are told apart by `phx_ref`.
pub fn apply_join(
    table: &PresenceTable,
    joins: &BTreeMap<PresenceKey, Vec<PresenceMeta>>,
) -> PresenceTable {
    let mut next = table.clone();
    for (key, metas) in joins {
        next.0.entry(key.clone()).or_default().extend(metas.iter().cloned());
    }
    prune(next)
}

/// Remove exactly the metas whose session reference matches one of the
/// leaving metas. Keys left with no metas are removed from the table, never
/// kept as an empty list. A leave for an absent key is a no-op.
pub fn apply_leave(
    table: &PresenceTable,
    leaves: &BTreeMap<PresenceKey, Vec<PresenceMeta>>,
) -> PresenceTable {
    let mut next = table.clone();
    for (key, leaving) in leaves {
        let Some(metas) = next.0.get_mut(key) else {
            continue;
        };
        metas.retain(|meta| !leaving.iter().any(|l| l.phx_ref == meta.phx_ref));
        if metas.is_empty() {
            next.0.remove(key);
        }
    }
    prune(next)
}

/// Apply a full diff: joins and leaves computed independently against the
/// pre-diff table, merged with leave results winning for keys in both.
pub fn apply_diff(table: &PresenceTable, diff: &PresenceDiff) -> PresenceTable {
    let joined = apply_join(table, &diff.joins);
    let left = apply_leave(table, &diff.leaves);

    let mut merged = joined;
    for key in diff.leaves.keys() {
        match left.0.get(key) {
            Some(metas) => {
                merged.0.insert(key.clone(), metas.clone());
            }
            None => {
                merged.0.remove(key);
            }
        }
    }
    prune(merged)
}

/// Drop every key whose meta list is empty.
fn prune(mut table: PresenceTable) -> PresenceTable {
    table.0.retain(|_, metas| !metas.is_empty());
    table
}

/// Decode a full presence snapshot from its wire payload.
///
/// The wire shape is `{ "<kind>:<id>": { "metas": [...] }, ... }`. Entries
/// with an unparseable key or a missing/malformed meta list are skipped with
/// a warning; a bad entry never poisons the whole table.
pub fn decode_state(payload: &serde_json::Value) -> PresenceTable {
    PresenceTable(decode_entries(payload, "presence_state"))
}

/// Decode an incremental diff from its wire payload
/// (`{ "joins": {...}, "leaves": {...} }`).
pub fn decode_diff(payload: &serde_json::Value) -> PresenceDiff {
    PresenceDiff {
        joins: decode_entries(&payload["joins"], "presence_diff.joins"),
        leaves: decode_entries(&payload["leaves"], "presence_diff.leaves"),
    }
}

fn decode_entries(
    value: &serde_json::Value,
    context: &str,
) -> BTreeMap<PresenceKey, Vec<PresenceMeta>> {
    let mut entries = BTreeMap::new();
    let Some(object) = value.as_object() else {
        if !value.is_null() {
            warn!(context, "presence payload is not an object, ignoring");
        }
        return entries;
    };

    for (raw_key, entry) in object {
        let Ok(key) = raw_key.parse::<PresenceKey>() else {
            warn!(context, key = raw_key.as_str(), "unparseable presence key, skipping");
            continue;
        };
        let Some(metas_value) = entry.get("metas") else {
            warn!(context, key = raw_key.as_str(), "presence entry missing metas, skipping");
            continue;
        };
        match serde_json::from_value::<Vec<PresenceMeta>>(metas_value.clone()) {
            Ok(metas) if !metas.is_empty() => {
                entries.insert(key, metas);
            }
            Ok(_) => {
                warn!(context, key = raw_key.as_str(), "presence entry has empty metas, skipping");
            }
            Err(error) => {
                warn!(
                    context,
                    key = raw_key.as_str(),
                    error = %error,
                    "malformed presence metas, skipping"
                );
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn metas(refs: &[&str]) -> Vec<PresenceMeta> {
        refs.iter().map(|r| PresenceMeta::new(*r)).collect()
    }

    fn table(entries: &[(&PresenceKey, &[&str])]) -> PresenceTable {
        let mut t = PresenceTable::new();
        for (key, refs) in entries {
            t.0.insert((*key).clone(), metas(refs));
        }
        t
    }

    #[test]
    fn join_inserts_new_key() {
        let alice = PresenceKey::customer("alice");
        let joins = BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]);

        let next = apply_join(&PresenceTable::new(), &joins);
        assert!(next.is_online(&alice));
        assert_eq!(next.metas(&alice).len(), 1);
    }

    #[test]
    fn join_appends_to_existing_metas() {
        let alice = PresenceKey::customer("alice");
        let base = table(&[(&alice, &["ref-1"])]);
        let joins = BTreeMap::from([(alice.clone(), metas(&["ref-2"]))]);

        let next = apply_join(&base, &joins);
        let refs: Vec<_> = next.metas(&alice).iter().map(|m| m.phx_ref.as_str()).collect();
        assert_eq!(refs, vec!["ref-1", "ref-2"]);
    }

    #[test]
    fn join_does_not_deduplicate_metas() {
        let alice = PresenceKey::customer("alice");
        let base = table(&[(&alice, &["ref-1"])]);
        let joins = BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]);

        let next = apply_join(&base, &joins);
        assert_eq!(next.metas(&alice).len(), 2);
    }

    #[test]
    fn leave_matches_by_session_reference() {
        let alice = PresenceKey::customer("alice");
        let base = table(&[(&alice, &["ref-1", "ref-2"])]);
        let leaves = BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]);

        let next = apply_leave(&base, &leaves);
        let refs: Vec<_> = next.metas(&alice).iter().map(|m| m.phx_ref.as_str()).collect();
        assert_eq!(refs, vec!["ref-2"]);
    }

    #[test]
    fn leave_removes_key_when_last_meta_goes() {
        let alice = PresenceKey::customer("alice");
        let base = table(&[(&alice, &["ref-1"])]);
        let leaves = BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]);

        let next = apply_leave(&base, &leaves);
        assert!(!next.is_online(&alice));
        assert!(!next.0.contains_key(&alice));
    }

    #[test]
    fn leave_for_absent_key_is_a_no_op() {
        let base = table(&[(&PresenceKey::user("bob"), &["ref-9"])]);
        let leaves = BTreeMap::from([(PresenceKey::customer("ghost"), metas(&["ref-1"]))]);

        let next = apply_leave(&base, &leaves);
        assert_eq!(next, base);
    }

    #[test]
    fn diff_leave_wins_over_join_for_same_key() {
        // A join and a leave for the same key in one diff resolves to the
        // leave outcome computed against the pre-diff state.
        let alice = PresenceKey::customer("alice");
        let base = table(&[(&alice, &["ref-1"])]);
        let diff = PresenceDiff {
            joins: BTreeMap::from([(alice.clone(), metas(&["ref-2"]))]),
            leaves: BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]),
        };

        let next = apply_diff(&base, &diff);
        assert!(!next.is_online(&alice));
    }

    #[test]
    fn diff_applies_joins_and_leaves_to_disjoint_keys() {
        let alice = PresenceKey::customer("alice");
        let bob = PresenceKey::user("bob");
        let base = table(&[(&bob, &["ref-9"])]);
        let diff = PresenceDiff {
            joins: BTreeMap::from([(alice.clone(), metas(&["ref-1"]))]),
            leaves: BTreeMap::from([(bob.clone(), metas(&["ref-9"]))]),
        };

        let next = apply_diff(&base, &diff);
        assert!(next.is_online(&alice));
        assert!(!next.is_online(&bob));
    }

    #[test]
    #[traced_test]
    fn decode_state_skips_malformed_entries() {
        let payload = json!({
            "customer:alice": { "metas": [{ "phx_ref": "ref-1", "online_at": 1700000000 }] },
            "customer:broken": { "no_metas_here": true },
            "not-a-key": { "metas": [{ "phx_ref": "ref-2" }] },
        });

        let state = decode_state(&payload);
        assert_eq!(state.len(), 1);
        assert!(state.is_online(&PresenceKey::customer("alice")));
        assert_eq!(state.metas(&PresenceKey::customer("alice"))[0].online_at, Some(1700000000));
        assert!(logs_contain("presence entry missing metas"));
        assert!(logs_contain("unparseable presence key"));
    }

    #[test]
    fn decode_diff_tolerates_missing_sides() {
        let diff = decode_diff(&json!({
            "joins": { "user:7": { "metas": [{ "phx_ref": "r" }] } }
        }));
        assert_eq!(diff.joins.len(), 1);
        assert!(diff.leaves.is_empty());
    }

    #[test]
    fn decode_state_ignores_non_object_payload() {
        assert!(decode_state(&json!(null)).is_empty());
        assert!(decode_state(&json!("nope")).is_empty());
    }
}
