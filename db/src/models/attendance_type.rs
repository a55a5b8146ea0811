use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};

/// A reusable attendance category ("Subuh", "Maghrib", ...).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "AttendanceTypes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_frequent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_type_scope::Entity")]
    Scopes,
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::attendance_type_scope::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Scopes.def()
    }
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        name: &str,
        description: Option<&str>,
        is_frequent: bool,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            name: Set(name.to_owned()),
            description: Set(description.map(|d| d.to_owned())),
            is_frequent: Set(is_frequent),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
        Entity::find().order_by_asc(Column::Id).all(db).await
    }

    /// Rename and/or re-describe a type. `description: Some(None)` clears it.
    pub async fn update_details<C: ConnectionTrait>(
        db: &C,
        id: i64,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<Model, DbErr> {
        let model = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Attendance type {id} not found")))?;

        let mut active_model: ActiveModel = model.into();
        if let Some(name) = name {
            active_model.name = Set(name.to_owned());
        }
        if let Some(description) = description {
            active_model.description = Set(description.map(|d| d.to_owned()));
        }
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    /// Returns `true` when a row was removed.
    pub async fn delete_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}
