use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Icon used when a category is saved without one
pub const DEFAULT_CATEGORY_ICON: &str = "📦";

/// Theme primary color used when a category is saved without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#6C63FF";

/// Id of the built-in category used as the lookup fallback
pub const OTHER_CATEGORY_ID: &str = "other";

/// Built-in category definition shared by every user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltInCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

/// Built-in categories in canonical display order. "other" must stay last.
pub static BUILT_IN_CATEGORIES: [BuiltInCategory; 8] = [
    BuiltInCategory { id: "food", name: "Gıda", icon: "🍔", color: "#FF6B6B" },
    BuiltInCategory { id: "transport", name: "Ulaşım", icon: "🚗", color: "#4ECDC4" },
    BuiltInCategory { id: "entertainment", name: "Eğlence", icon: "🎬", color: "#95E1D3" },
    BuiltInCategory { id: "bills", name: "Faturalar", icon: "💡", color: "#F38181" },
    BuiltInCategory { id: "shopping", name: "Alışveriş", icon: "🛍️", color: "#AA96DA" },
    BuiltInCategory { id: "health", name: "Sağlık", icon: "🏥", color: "#FCBAD3" },
    BuiltInCategory { id: "education", name: "Eğitim", icon: "📚", color: "#A8E6CF" },
    BuiltInCategory { id: OTHER_CATEGORY_ID, name: "Diğer", icon: "📦", color: "#D3D3D3" },
];

impl BuiltInCategory {
    /// Find a built-in category by id
    pub fn find(id: &str) -> Option<&'static BuiltInCategory> {
        BUILT_IN_CATEGORIES.iter().find(|c| c.id == id)
    }

    pub fn is_built_in(id: &str) -> bool {
        Self::find(id).is_some()
    }

    /// The canonical "other" category
    pub fn other() -> &'static BuiltInCategory {
        &BUILT_IN_CATEGORIES[BUILT_IN_CATEGORIES.len() - 1]
    }

    /// Storage key of a user's override record for this category
    pub fn override_storage_id(&self, user_id: &str) -> String {
        format!("{}_override_{}", self.id, user_id)
    }

    /// Render this category without any user override applied
    pub fn to_category(&self) -> Category {
        Category {
            id: self.id.to_string(),
            name: self.name.to_string(),
            icon: self.icon.to_string(),
            color: self.color.to_string(),
            user_id: None,
            kind: CategoryKind::BuiltIn,
            created_at: None,
            updated_at: None,
        }
    }

    /// Render this category with a user's override applied.
    ///
    /// Appearance fields present on the override win, except a blank name;
    /// the id always stays the built-in id so callers never see the
    /// override's storage key.
    pub fn with_override(&self, record: &CategoryRecord) -> Category {
        Category {
            id: self.id.to_string(),
            name: record
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| self.name.to_string()),
            icon: record.icon.clone().unwrap_or_else(|| self.icon.to_string()),
            color: record.color.clone().unwrap_or_else(|| self.color.to_string()),
            user_id: record.user_id.clone(),
            kind: CategoryKind::Override {
                storage_id: record.id.clone(),
            },
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Where an update for a given category id has to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryTarget<'a> {
    /// A built-in category; updates become a per-user override
    BuiltIn(&'static BuiltInCategory),
    /// A record stored in the category collection
    Stored(&'a str),
}

impl<'a> CategoryTarget<'a> {
    pub fn resolve(category_id: &'a str) -> Self {
        match BuiltInCategory::find(category_id) {
            Some(built_in) => CategoryTarget::BuiltIn(built_in),
            None => CategoryTarget::Stored(category_id),
        }
    }
}

/// Partial category payload. Every field present replaces the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl CategoryPatch {
    pub fn apply_to(&self, record: &mut CategoryRecord) {
        if let Some(name) = &self.name {
            record.name = Some(name.clone());
        }
        if let Some(icon) = &self.icon {
            record.icon = Some(icon.clone());
        }
        if let Some(color) = &self.color {
            record.color = Some(color.clone());
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A category record as persisted in the shared collection.
///
/// Custom categories and built-in overrides of every user live side by side
/// in one collection. Keys this version does not know about are kept in
/// `extra` so a save never drops them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CategoryRecord {
    /// Build a new custom category owned by `user_id`
    pub fn new_custom(id: String, user_id: &str, patch: &CategoryPatch, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            id,
            user_id: Some(user_id.to_string()),
            created_at: Some(now),
            ..Self::default()
        };
        patch.apply_to(&mut record);
        record.icon.get_or_insert_with(|| DEFAULT_CATEGORY_ICON.to_string());
        record.color.get_or_insert_with(|| DEFAULT_CATEGORY_COLOR.to_string());
        record
    }

    /// Build the override record for `built_in` owned by `user_id`
    pub fn new_override(
        built_in: &BuiltInCategory,
        user_id: &str,
        patch: &CategoryPatch,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            id: built_in.override_storage_id(user_id),
            user_id: Some(user_id.to_string()),
            is_override: true,
            original_id: Some(built_in.id.to_string()),
            created_at: Some(now),
            ..Self::default()
        };
        patch.apply_to(&mut record);
        record
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    /// Whether this record is an override of the built-in category `built_in_id`
    pub fn overrides(&self, built_in_id: &str) -> bool {
        self.is_override && self.original_id.as_deref() == Some(built_in_id)
    }

    /// Merge a patch and stamp the update time
    pub fn update(&mut self, patch: &CategoryPatch, now: DateTime<Utc>) {
        patch.apply_to(self);
        self.updated_at = Some(now);
    }

    /// Render a custom record, or `None` when it has no usable id or name
    pub fn to_custom_category(&self) -> Option<Category> {
        if self.id.is_empty() {
            return None;
        }
        let name = self.name.as_deref().filter(|n| !n.trim().is_empty())?;

        Some(Category {
            id: self.id.clone(),
            name: name.to_string(),
            icon: self
                .icon
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
            color: self
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            user_id: self.user_id.clone(),
            kind: CategoryKind::Custom,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// How an effective category came to be
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategoryKind {
    BuiltIn,
    /// A built-in category with a user's appearance override applied
    Override { storage_id: String },
    Custom,
}

/// Render-ready category as shown to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    /// Owner for custom categories and overrides, None for plain built-ins
    pub user_id: Option<String>,
    pub kind: CategoryKind,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    /// True for built-ins, whether or not the user has overridden them
    pub fn is_built_in(&self) -> bool {
        !matches!(self.kind, CategoryKind::Custom)
    }
}

/// A user's category list split into built-ins and personal categories
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveCategories {
    /// Always the 8 built-ins, in canonical order
    pub builtins: Vec<Category>,
    pub custom: Vec<Category>,
}

impl EffectiveCategories {
    /// Built-ins without any override, and no custom categories
    pub fn built_ins_only() -> Self {
        Self {
            builtins: BUILT_IN_CATEGORIES.iter().map(BuiltInCategory::to_category).collect(),
            custom: Vec::new(),
        }
    }

    /// Built-ins followed by custom categories
    pub fn all(&self) -> impl Iterator<Item = &Category> {
        self.builtins.iter().chain(self.custom.iter())
    }

    pub fn into_vec(self) -> Vec<Category> {
        let mut all = self.builtins;
        all.extend(self.custom);
        all
    }
}
