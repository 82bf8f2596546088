//! Categories label transactions, budgets and goals.
//!
//! System categories have no owner, are visible to every user and are
//! read-only. User categories may be nested through `parent_id`.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransactionKind, util::parse_uuid};

pub const DEFAULT_CATEGORY_COLOR: &str = "#2196f3";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// Categories share the transaction kinds.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub sort_order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with its nested children, used by the hierarchy view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<String>,
    pub parent_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Parent,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(value: &Category) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.map(|id| id.to_string())),
            parent_id: ActiveValue::Set(value.parent_id.map(|id| id.to_string())),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            color: ActiveValue::Set(value.color.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            description: ActiveValue::Set(value.description.clone()),
            is_system: ActiveValue::Set(value.is_system),
            is_active: ActiveValue::Set(value.is_active),
            sort_order: ActiveValue::Set(value.sort_order),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            user_id: model
                .user_id
                .as_deref()
                .map(|id| parse_uuid(id, "user"))
                .transpose()?,
            parent_id: model
                .parent_id
                .as_deref()
                .map(|id| parse_uuid(id, "category"))
                .transpose()?,
            name: model.name,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            color: model.color,
            icon: model.icon,
            description: model.description,
            is_system: model.is_system,
            is_active: model.is_active,
            sort_order: model.sort_order,
            transaction_count: None,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Arrange a flat list into a forest.
///
/// Roots are categories without a parent or whose parent is not in `items`.
/// Siblings keep the order they have in `items`.
pub fn build_hierarchy(items: Vec<Category>) -> Vec<CategoryNode> {
    use std::collections::{HashMap, HashSet};

    let ids: HashSet<Uuid> = items.iter().map(|c| c.id).collect();
    let mut children: HashMap<Uuid, Vec<Category>> = HashMap::new();
    let mut roots = Vec::new();
    for category in items {
        match category.parent_id {
            Some(parent) if ids.contains(&parent) && parent != category.id => {
                children.entry(parent).or_default().push(category);
            }
            _ => roots.push(category),
        }
    }

    fn attach(category: Category, children: &mut HashMap<Uuid, Vec<Category>>) -> CategoryNode {
        let nested = children.remove(&category.id).unwrap_or_default();
        CategoryNode {
            category,
            children: nested
                .into_iter()
                .map(|child| attach(child, children))
                .collect(),
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn category(name: &str, parent: Option<Uuid>) -> Category {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        Category {
            id: Uuid::new_v4(),
            user_id: None,
            parent_id: parent,
            name: name.to_string(),
            kind: TransactionKind::Expense,
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: None,
            description: None,
            is_system: false,
            is_active: true,
            sort_order: 0,
            transaction_count: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn hierarchy_nests_children_under_parents() {
        let food = category("Food", None);
        let groceries = category("Groceries", Some(food.id));
        let fruit = category("Fruit", Some(groceries.id));
        let rent = category("Rent", None);

        let forest = build_hierarchy(vec![fruit, food.clone(), rent, groceries]);

        assert_eq!(forest.len(), 2);
        let food_node = forest.iter().find(|n| n.category.id == food.id).unwrap();
        assert_eq!(food_node.children.len(), 1);
        assert_eq!(food_node.children[0].category.name, "Groceries");
        assert_eq!(food_node.children[0].children[0].category.name, "Fruit");
    }

    #[test]
    fn orphans_become_roots() {
        let orphan = category("Orphan", Some(Uuid::new_v4()));
        let forest = build_hierarchy(vec![orphan]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }
}
