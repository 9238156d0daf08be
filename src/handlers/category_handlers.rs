use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handlers::common::{ErrorResponse, SessionUser};
use crate::models::category::{BuiltInCategory, CategoryPatch, EffectiveCategories};
use crate::services::category_service::CategoryService;
use crate::validation::{validate_category_name, validate_color};

/// Request payload for creating or editing a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(custom(function = "validate_category_name"))]
    pub name: String,

    pub icon: Option<String>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

impl From<CategoryRequest> for CategoryPatch {
    fn from(request: CategoryRequest) -> Self {
        CategoryPatch {
            name: Some(request.name.trim().to_string()),
            icon: request.icon.filter(|icon| !icon.trim().is_empty()),
            color: request.color,
        }
    }
}

fn validated(request: CategoryRequest) -> Result<CategoryPatch, ErrorResponse> {
    request
        .validate()
        .map_err(|errors| ErrorResponse::validation(&errors))?;
    Ok(request.into())
}

/// Handler for listing the signed-in user's categories
pub async fn list_categories_handler(
    category_service: &dyn CategoryService,
    session: Option<&SessionUser>,
) -> Result<EffectiveCategories, ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("load categories"))?;
    Ok(category_service
        .get_effective_categories(&session.user_id)
        .await)
}

/// Handler for creating a custom category. Returns the new category id.
pub async fn create_category_handler(
    category_service: &dyn CategoryService,
    session: Option<&SessionUser>,
    request: CategoryRequest,
) -> Result<String, ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("add category"))?;
    let patch = validated(request)?;

    category_service
        .add_category(&session.user_id, patch)
        .await
        .map_err(|e| ErrorResponse::from_category_error("add category", &e))
}

/// Handler for editing a category.
///
/// Built-in ids are passed through as-is; the service turns them into a
/// per-user override.
pub async fn update_category_handler(
    category_service: &dyn CategoryService,
    session: Option<&SessionUser>,
    category_id: &str,
    request: CategoryRequest,
) -> Result<(), ErrorResponse> {
    let session = session.ok_or_else(|| ErrorResponse::session_required("update category"))?;
    let patch = validated(request)?;

    category_service
        .update_category(category_id, patch, Some(&session.user_id))
        .await
        .map_err(|e| ErrorResponse::from_category_error("update category", &e))
}

/// Handler for deleting one of the user's own categories.
///
/// Built-in categories are refused here without touching the store, which
/// has no notion of built-ins at delete time.
pub async fn delete_category_handler(
    category_service: &dyn CategoryService,
    session: Option<&SessionUser>,
    category_id: &str,
) -> Result<(), ErrorResponse> {
    if BuiltInCategory::is_built_in(category_id) {
        return Err(ErrorResponse::new(
            "built_in_category",
            "Built-in categories cannot be deleted",
        ));
    }

    let session = session.ok_or_else(|| ErrorResponse::session_required("delete category"))?;

    let owned = category_service
        .owns_category(&session.user_id, category_id)
        .await
        .map_err(|e| ErrorResponse::from_category_error("delete category", &e))?;
    if !owned {
        return Err(ErrorResponse::new(
            "category_not_found",
            "Could not delete category: category not found",
        ));
    }

    category_service
        .delete_category(category_id)
        .await
        .map_err(|e| ErrorResponse::from_category_error("delete category", &e))
}
