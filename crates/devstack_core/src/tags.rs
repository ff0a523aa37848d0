//! crates/devstack_core/src/tags.rs
//!
//! Pure planning logic for tag reconciliation. Given the tags currently
//! attached to a question and the desired tag names, this module computes
//! which tags to add, which to remove, and which to keep — all compared
//! case-insensitively. The store applies the plan inside one transaction so
//! counters and join rows move together.

use uuid::Uuid;

/// A tag currently attached to a question, as the planner needs to see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedTag {
    pub id: Uuid,
    pub name: String,
}

/// The outcome of diffing current against desired tags.
///
/// `kept` preserves the current attach order; `to_add` preserves the desired
/// order, so the final attached list is `kept` followed by the ids resolved
/// for `to_add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPlan {
    pub kept: Vec<Uuid>,
    pub to_add: Vec<String>,
    pub to_remove: Vec<Uuid>,
}

impl TagPlan {
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Trims, drops empties, and dedupes case-insensitively, keeping the
/// first-seen casing. `["java", "Java", "JAVA"]` collapses to `["java"]`.
pub fn normalize_tags(names: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut result = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        result.push(trimmed.to_string());
    }
    result
}

/// Diffs the currently attached tags against the desired names.
///
/// A desired name that differs only in case from a current tag counts as the
/// same tag: it is kept, not re-added, so its counter is never
/// double-incremented. Desired names are normalized before diffing.
pub fn plan_tags(current: &[AttachedTag], desired: &[String]) -> TagPlan {
    let desired = normalize_tags(desired);

    let mut plan = TagPlan::default();
    for tag in current {
        let folded = tag.name.to_lowercase();
        if desired.iter().any(|name| name.to_lowercase() == folded) {
            plan.kept.push(tag.id);
        } else {
            plan.to_remove.push(tag.id);
        }
    }
    for name in desired {
        let folded = name.to_lowercase();
        if !current.iter().any(|tag| tag.name.to_lowercase() == folded) {
            plan.to_add.push(name);
        }
    }
    plan
}
