// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dashboard read model helpers: selection navigation and pagination.

use huddle_core::{ConversationId, Pagination};

/// Pick the next selection after the current one becomes invalid.
///
/// Policy: empty list yields none; no prior selection, or a prior selection
/// not in the list, yields the first id. A selection at the head advances to
/// the next; one at the tail falls back to the previous. Anywhere in the
/// middle, prefer next, then previous, then first, skipping the stale id.
pub fn next_selected_conversation_id(
    current: Option<&ConversationId>,
    valid_ids: &[ConversationId],
) -> Option<ConversationId> {
    let first = valid_ids.first()?;
    let current = match current {
        Some(id) => id,
        None => return Some(first.clone()),
    };
    let position = match valid_ids.iter().position(|id| id == current) {
        Some(position) => position,
        None => return Some(first.clone()),
    };

    if position == 0 {
        return valid_ids.get(1).or(Some(first)).cloned();
    }
    if position == valid_ids.len() - 1 {
        return valid_ids.get(position - 1).cloned();
    }
    [valid_ids.get(position + 1), valid_ids.get(position - 1), Some(first)]
        .into_iter()
        .flatten()
        .find(|id| *id != current)
        .cloned()
}

/// More pages exist when the cursor is present and fewer ids are loaded than
/// the server-reported total.
pub fn has_more(pagination: &Pagination, loaded: usize) -> bool {
    pagination.next.is_some() && loaded < pagination.total
}

/// Append `incoming` to `existing` with set-union semantics: duplicates are
/// dropped, order of first appearance is preserved.
pub fn append_ids(existing: &mut Vec<ConversationId>, incoming: Vec<ConversationId>) {
    for id in incoming {
        if !existing.contains(&id) {
            existing.push(id);
        }
    }
}
