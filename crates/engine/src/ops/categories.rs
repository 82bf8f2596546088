use std::collections::{HashMap, HashSet};

use sea_orm::{
    Condition, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect,
    Statement, TransactionTrait, Value, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Category, CategoryFilter, CategoryNode, CategoryPatch, EngineError, NewCategory, Page,
    PageRequest, ParentFilter, ResultEngine, budgets, categories, goals, transactions,
    util::{ensure_color, normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{Engine, with_tx};

/// Categories visible to the user: system rows plus the user's own.
fn accessible(user_id: &str) -> Condition {
    Condition::any()
        .add(categories::Column::IsSystem.eq(true))
        .add(categories::Column::UserId.eq(user_id))
}

/// Ids of `root` and every category below it, among `all`.
pub(super) fn with_descendants(root: &str, all: &[categories::Model]) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for model in all {
        if let Some(parent) = model.parent_id.as_deref() {
            children.entry(parent).or_default().push(model.id.as_str());
        }
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![root];
    let mut ids = Vec::new();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        ids.push(id.to_string());
        if let Some(next) = children.get(id) {
            stack.extend(next.iter().copied());
        }
    }
    ids
}

impl Engine {
    pub async fn create_category(
        &self,
        user_id: &str,
        cmd: NewCategory,
    ) -> ResultEngine<Category> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let name = normalize_required_name(&cmd.name, "Category name")?;
            let parent_id = match cmd.parent_id.as_deref() {
                Some(parent) => Some(self.require_parent(&db_tx, parent, user_id).await?),
                None => None,
            };
            let sort_order = cmd.sort_order.unwrap_or(0);
            ensure_sort_order(sort_order)?;

            let category = Category {
                id: Uuid::new_v4(),
                user_id: Some(parse_uuid(user_id, "user")?),
                parent_id,
                name,
                kind: cmd.kind,
                color: match cmd.color.as_deref() {
                    Some(color) => ensure_color(color)?,
                    None => categories::DEFAULT_CATEGORY_COLOR.to_string(),
                },
                icon: normalize_optional_text(cmd.icon.as_deref()),
                description: normalize_optional_text(cmd.description.as_deref()),
                is_system: false,
                is_active: true,
                sort_order,
                transaction_count: None,
                created_at: now,
                updated_at: now,
            };
            categories::ActiveModel::from(&category)
                .insert(&db_tx)
                .await?;
            Ok::<_, EngineError>(category)
        })
    }

    /// Accessible categories ordered by `sort_order` then name.
    pub async fn list_categories(
        &self,
        user_id: &str,
        filter: CategoryFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Category>> {
        with_tx!(self, |db_tx| {
            let mut query = categories::Entity::find().filter(accessible(user_id));
            if let Some(kind) = filter.kind {
                query = query.filter(categories::Column::Kind.eq(kind.as_str()));
            }
            if let Some(is_system) = filter.is_system {
                query = query.filter(categories::Column::IsSystem.eq(is_system));
            }
            if let Some(is_active) = filter.is_active {
                query = query.filter(categories::Column::IsActive.eq(is_active));
            }
            match &filter.parent {
                Some(ParentFilter::Root) => {
                    query = query.filter(categories::Column::ParentId.is_null());
                }
                Some(ParentFilter::Id(parent)) => {
                    let parent = parse_uuid(parent, "category")?;
                    query = query.filter(categories::Column::ParentId.eq(parent.to_string()));
                }
                None => {}
            }

            let total = query.clone().count(&db_tx).await?;
            let models = query
                .order_by_asc(categories::Column::SortOrder)
                .order_by_asc(categories::Column::Name)
                .offset(page.offset())
                .limit(page.limit)
                .all(&db_tx)
                .await?;

            let counts = if filter.include_counts {
                let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
                transaction_counts(&db_tx, user_id, &ids).await?
            } else {
                HashMap::new()
            };

            let items = models
                .into_iter()
                .map(|model| {
                    let count = filter
                        .include_counts
                        .then(|| counts.get(&model.id).copied().unwrap_or(0));
                    let mut category = Category::try_from(model)?;
                    category.transaction_count = count;
                    Ok(category)
                })
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(Page::new(items, total, page))
        })
    }

    /// Active accessible categories as a forest.
    pub async fn category_hierarchy(&self, user_id: &str) -> ResultEngine<Vec<CategoryNode>> {
        with_tx!(self, |db_tx| {
            let items = categories::Entity::find()
                .filter(accessible(user_id))
                .filter(categories::Column::IsActive.eq(true))
                .order_by_asc(categories::Column::SortOrder)
                .order_by_asc(categories::Column::Name)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok::<_, EngineError>(categories::build_hierarchy(items))
        })
    }

    pub async fn category(&self, category_id: &str, user_id: &str) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            let model = self.require_category(&db_tx, category_id, user_id).await?;
            Category::try_from(model)
        })
    }

    pub async fn update_category(
        &self,
        category_id: &str,
        user_id: &str,
        patch: CategoryPatch,
    ) -> ResultEngine<Category> {
        let now = self.now();
        with_tx!(self, |db_tx| {
            let model = self
                .require_category_writable(&db_tx, category_id, user_id, "modified")
                .await?;
            let mut category = Category::try_from(model)?;

            if let Some(name) = patch.name.as_deref() {
                category.name = normalize_required_name(name, "Category name")?;
            }
            if let Some(kind) = patch.kind {
                category.kind = kind;
            }
            if let Some(color) = patch.color.as_deref() {
                category.color = ensure_color(color)?;
            }
            if let Some(icon) = patch.icon {
                category.icon = normalize_optional_text(icon.as_deref());
            }
            if let Some(description) = patch.description {
                category.description = normalize_optional_text(description.as_deref());
            }
            if let Some(is_active) = patch.is_active {
                category.is_active = is_active;
            }
            if let Some(sort_order) = patch.sort_order {
                ensure_sort_order(sort_order)?;
                category.sort_order = sort_order;
            }
            if let Some(parent) = patch.parent_id {
                category.parent_id = match parent.as_deref() {
                    Some(parent) => {
                        let parent_id = self.require_parent(&db_tx, parent, user_id).await?;
                        self.ensure_no_cycle(&db_tx, category.id, parent_id).await?;
                        Some(parent_id)
                    }
                    None => None,
                };
            }
            category.updated_at = now;

            categories::ActiveModel::from(&category)
                .update(&db_tx)
                .await?;
            Ok::<_, EngineError>(category)
        })
    }

    /// Delete a user category. Children become roots, transactions and goals
    /// lose the category and budgets on it are removed.
    pub async fn delete_category(&self, category_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_category_writable(&db_tx, category_id, user_id, "deleted")
                .await?;
            let id = model.id.clone();

            categories::Entity::update_many()
                .col_expr(categories::Column::ParentId, Expr::value(None::<String>))
                .filter(categories::Column::ParentId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            transactions::Entity::update_many()
                .col_expr(transactions::Column::CategoryId, Expr::value(None::<String>))
                .filter(transactions::Column::CategoryId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            goals::Entity::update_many()
                .col_expr(goals::Column::CategoryId, Expr::value(None::<String>))
                .filter(goals::Column::CategoryId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_many()
                .filter(budgets::Column::CategoryId.eq(id.clone()))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(id.clone())
                .exec(&db_tx)
                .await?;

            tracing::info!(category_id = %id, user_id, "category deleted");
            Ok::<_, EngineError>(())
        })
    }

    /// Resolve a parent reference: it must exist (400) and be accessible (403).
    async fn require_parent(
        &self,
        db: &DatabaseTransaction,
        parent_id: &str,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        match self.require_category(db, parent_id, user_id).await {
            Ok(model) => parse_uuid(&model.id, "category"),
            Err(EngineError::KeyNotFound(_)) => Err(EngineError::InvalidInput(
                "Parent category not found".to_string(),
            )),
            Err(EngineError::Forbidden(_)) => Err(EngineError::Forbidden(
                "Access denied to parent category".to_string(),
            )),
            Err(err) => Err(err),
        }
    }

    /// Walk up from `parent_id`; reaching `category_id` would close a loop.
    async fn ensure_no_cycle(
        &self,
        db: &DatabaseTransaction,
        category_id: Uuid,
        parent_id: Uuid,
    ) -> ResultEngine<()> {
        if category_id == parent_id {
            return Err(EngineError::InvalidInput(
                "Category cannot be its own parent".to_string(),
            ));
        }
        let target = category_id.to_string();
        let mut seen = HashSet::new();
        let mut current = Some(parent_id.to_string());
        while let Some(id) = current {
            if id == target {
                return Err(EngineError::InvalidInput(
                    "Circular reference detected".to_string(),
                ));
            }
            if !seen.insert(id.clone()) {
                break;
            }
            current = categories::Entity::find_by_id(id)
                .one(db)
                .await?
                .and_then(|model| model.parent_id);
        }
        Ok(())
    }
}

fn ensure_sort_order(sort_order: i32) -> ResultEngine<()> {
    if sort_order < 0 {
        return Err(EngineError::InvalidInput(
            "sort order must be >= 0".to_string(),
        ));
    }
    Ok(())
}

async fn transaction_counts<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    category_ids: &[&str],
) -> ResultEngine<HashMap<String, u64>> {
    if category_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders = vec!["?"; category_ids.len()].join(", ");
    let sql = format!(
        "SELECT category_id, COUNT(*) AS count FROM transactions \
         WHERE user_id = ? AND category_id IN ({placeholders}) GROUP BY category_id"
    );
    let mut values: Vec<Value> = vec![user_id.into()];
    values.extend(category_ids.iter().map(|id| Value::from(*id)));

    let backend = db.get_database_backend();
    let rows = db
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    rows.into_iter()
        .map(|row| {
            let id: String = row.try_get("", "category_id")?;
            let count: i64 = row.try_get("", "count")?;
            Ok((id, count.max(0) as u64))
        })
        .collect()
}
