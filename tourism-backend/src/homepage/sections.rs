//! Homepage sections
//!
//! A homepage is an ordered list of blocks. The editor submits the whole list on
//! save; this module decides what that means for the stored rows:
//! - which fields each block type must carry
//! - how sort orders are normalised (contiguous, starting at 0)
//! - which rows to create, update and delete when a list is saved

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::models::{BlockType, SectionInput};
use crate::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Non-empty string
    Text,
    /// Array (may be empty)
    List,
}

/// Fields each block type must provide
fn required_fields(block_type: BlockType) -> &'static [(&'static str, FieldKind)] {
    use FieldKind::*;
    match block_type {
        BlockType::Hero => &[("heading", Text)],
        BlockType::Cta => &[("label", Text), ("href", Text)],
        BlockType::Testimonial => &[("quote", Text), ("author", Text)],
        BlockType::Features => &[("items", List)],
        BlockType::Gallery => &[("images", List)],
        BlockType::TourList | BlockType::HomestayList => &[],
        BlockType::Text => &[("body", Text)],
        BlockType::Faq => &[("items", List)],
    }
}

/// Check a block's field payload against its type's schema.
/// `prefix` scopes the reported field names (e.g. `sections[2].fields`).
pub fn validate_fields(block_type: BlockType, fields: &Map<String, Value>, prefix: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (name, kind) in required_fields(block_type) {
        let path = format!("{}.{}", prefix, name);
        match (kind, fields.get(*name)) {
            (FieldKind::Text, Some(Value::String(s))) if !s.trim().is_empty() => {}
            (FieldKind::Text, _) => errors.push(FieldError::new(&path, "is required")),
            (FieldKind::List, Some(Value::Array(_))) => {}
            (FieldKind::List, _) => errors.push(FieldError::new(&path, "must be an array")),
        }
    }

    // Lists of tours/homestays may cap how many cards they show
    if matches!(block_type, BlockType::TourList | BlockType::HomestayList) {
        if let Some(limit) = fields.get("limit") {
            let ok = limit.as_i64().map(|n| (1..=24).contains(&n)).unwrap_or(false);
            if !ok {
                errors.push(FieldError::new(
                    &format!("{}.limit", prefix),
                    "must be an integer between 1 and 24",
                ));
            }
        }
    }

    errors
}

/// Renumber `(id, sort_order)` pairs to 0..n, keeping their relative order.
/// Ties are broken by id so the result is deterministic.
pub fn normalized_order(items: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|&(id, order)| (order, id));
    sorted
        .into_iter()
        .enumerate()
        .map(|(position, (id, _))| (id, position as i64))
        .collect()
}

/// What saving a section list does to the stored blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    /// Indexes into the submitted list that have no id yet
    pub creates: Vec<usize>,
    /// `(block id, index)` pairs for sections that already exist
    pub updates: Vec<(i64, usize)>,
    /// Stored blocks missing from the submission
    pub deletes: Vec<i64>,
}

/// Compare a submitted section list with the ids currently stored.
/// The position in `submitted` becomes the block's sort order.
pub fn plan_sync(existing_ids: &[i64], submitted: &[SectionInput]) -> Result<SyncPlan, Vec<FieldError>> {
    let existing: HashSet<i64> = existing_ids.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    let mut plan = SyncPlan::default();

    for (index, section) in submitted.iter().enumerate() {
        let prefix = format!("sections[{}]", index);
        errors.extend(validate_fields(section.block_type, &section.fields, &format!("{}.fields", prefix)));

        match section.id {
            None => plan.creates.push(index),
            Some(id) if !existing.contains(&id) => {
                errors.push(FieldError::new(&format!("{}.id", prefix), "does not match an existing block"));
            }
            Some(id) if !seen.insert(id) => {
                errors.push(FieldError::new(&format!("{}.id", prefix), "appears more than once"));
            }
            Some(id) => plan.updates.push((id, index)),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let kept: HashSet<i64> = plan.updates.iter().map(|(id, _)| *id).collect();
    plan.deletes = existing_ids.iter().copied().filter(|id| !kept.contains(id)).collect();

    Ok(plan)
}
