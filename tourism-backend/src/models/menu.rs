use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::validation::{Validate, Validator};

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: i64,
    pub label: String,
    pub url: String,
    pub parent_id: Option<i64>,
    pub sort_order: i64,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Menu item with its nested children, as served to the site navigation
#[derive(Debug, Clone, Serialize)]
pub struct MenuNode {
    pub id: i64,
    pub label: String,
    pub url: String,
    pub children: Vec<MenuNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenuItemRequest {
    pub label: String,
    pub url: String,
    pub parent_id: Option<i64>,
    pub sort_order: Option<i64>,
    pub visible: Option<bool>,
}

impl Validate for CreateMenuItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .required("label", &self.label, 100)
            .required("url", &self.url, 500)
            .non_negative("sort_order", self.sort_order.unwrap_or(0))
            .finish()
    }
}

/// `parent_id: null` moves the item to the top level; omitting it leaves the parent unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub label: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
    pub sort_order: Option<i64>,
    pub visible: Option<bool>,
}

impl Validate for UpdateMenuItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(label) = &self.label {
            v.required("label", label, 100);
        }
        if let Some(url) = &self.url {
            v.required("url", url, 500);
        }
        v.non_negative("sort_order", self.sort_order.unwrap_or(0)).finish()
    }
}

/// Arrange flat menu rows into a tree, children ordered by sort_order then id.
/// Items whose parent is missing from `items` (e.g. hidden) are dropped with their subtree.
pub fn build_menu_tree(items: &[MenuItem]) -> Vec<MenuNode> {
    let mut sorted: Vec<&MenuItem> = items.iter().collect();
    sorted.sort_by_key(|i| (i.sort_order, i.id));

    fn children_of(parent: Option<i64>, items: &[&MenuItem], depth: usize) -> Vec<MenuNode> {
        // Depth guard against cycles written directly to the database
        if depth > MAX_MENU_DEPTH {
            return Vec::new();
        }
        items
            .iter()
            .filter(|i| i.parent_id == parent)
            .map(|i| MenuNode {
                id: i.id,
                label: i.label.clone(),
                url: i.url.clone(),
                children: children_of(Some(i.id), items, depth + 1),
            })
            .collect()
    }

    children_of(None, &sorted, 0)
}

pub const MAX_MENU_DEPTH: usize = 8;

/// Whether re-parenting `id` under `new_parent` would make an item its own ancestor
pub fn creates_cycle(items: &[MenuItem], id: i64, new_parent: i64) -> bool {
    let mut current = Some(new_parent);
    let mut steps = 0;
    while let Some(ancestor) = current {
        if ancestor == id {
            return true;
        }
        steps += 1;
        if steps > items.len() {
            return true;
        }
        current = items.iter().find(|i| i.id == ancestor).and_then(|i| i.parent_id);
    }
    false
}

/// Number of ancestors above `id`, 0 for a top-level item
pub fn depth_of(items: &[MenuItem], id: i64) -> usize {
    let mut depth = 0;
    let mut current = items.iter().find(|i| i.id == id).and_then(|i| i.parent_id);
    while let Some(ancestor) = current {
        depth += 1;
        if depth > items.len() {
            break;
        }
        current = items.iter().find(|i| i.id == ancestor).and_then(|i| i.parent_id);
    }
    depth
}

/// Levels of descendants below `id`, 0 for a leaf
pub fn subtree_height(items: &[MenuItem], id: i64) -> usize {
    fn height(items: &[MenuItem], id: i64, budget: usize) -> usize {
        if budget == 0 {
            return 0;
        }
        items
            .iter()
            .filter(|i| i.parent_id == Some(id))
            .map(|child| 1 + height(items, child.id, budget - 1))
            .max()
            .unwrap_or(0)
    }
    height(items, id, items.len())
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}
