use api_types::{
    category::{CategoryNew, CategoryQuery, CategoryUpdate},
    envelope::MessageView,
};
use axum::{
    Extension,
    extract::{Path, State},
};
use engine::{
    Category, CategoryFilter, CategoryNode, CategoryPatch, NewCategory, PageRequest, ParentFilter,
};

use crate::{
    ApiJson, ApiQuery, ApiResult, Created, created, ok, paged, parse, parse_opt,
    server::{AuthUser, ServerState},
};

fn filter(query: &CategoryQuery) -> Result<CategoryFilter, crate::ServerError> {
    let defaults = CategoryFilter::default();
    Ok(CategoryFilter {
        kind: parse_opt(query.kind.as_deref())?,
        is_system: query.is_system,
        is_active: query.is_active.or(defaults.is_active),
        parent: query.parent_id.as_deref().map(|parent| match parent.trim() {
            "root" | "null" => ParentFilter::Root,
            id => ParentFilter::Id(id.to_string()),
        }),
        include_counts: query.include_counts.unwrap_or(defaults.include_counts),
    })
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Vec<Category>> {
    let page = PageRequest::new(query.page, query.limit, 50)?;
    let filter = filter(&query)?;
    paged(state.engine.list_categories(&user.id, filter, page).await?)
}

pub async fn hierarchy(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<Vec<CategoryNode>> {
    ok(state.engine.category_hierarchy(&user.id).await?)
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    ok(state.engine.category(&id, &user.id).await?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<CategoryNew>,
) -> Created<Category> {
    let cmd = NewCategory {
        name: payload.name,
        kind: parse(&payload.kind)?,
        color: payload.color,
        icon: payload.icon,
        description: payload.description,
        sort_order: payload.sort_order,
        parent_id: payload.parent_id,
    };
    created(state.engine.create_category(&user.id, cmd).await?)
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CategoryUpdate>,
) -> ApiResult<Category> {
    let patch = CategoryPatch {
        name: payload.name,
        kind: parse_opt(payload.kind.as_deref())?,
        color: payload.color,
        icon: payload.icon,
        description: payload.description,
        is_active: payload.is_active,
        sort_order: payload.sort_order,
        parent_id: payload.parent_id,
    };
    ok(state.engine.update_category(&id, &user.id, patch).await?)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<MessageView> {
    state.engine.delete_category(&id, &user.id).await?;
    ok(MessageView {
        message: "Category deleted successfully".to_string(),
    })
}
