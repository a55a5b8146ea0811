use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryOrder};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "AttendanceSessions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub attendance_type_id: i64,
    /// When the session was held.
    pub timestamp: DateTime<Utc>,
    pub created_by: i64,
    pub is_active: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_type::Entity",
        from = "Column::AttendanceTypeId",
        to = "super::attendance_type::Column::Id"
    )]
    AttendanceType,
    #[sea_orm(has_many = "super::attendance_session_status::Entity")]
    Statuses,
}

impl Related<super::attendance_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceType.def()
    }
}

impl Related<super::attendance_session_status::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statuses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    #[inline]
    pub fn is_closed(&self) -> bool {
        !self.is_active
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        attendance_type_id: i64,
        created_by: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            attendance_type_id: Set(attendance_type_id),
            timestamp: Set(timestamp),
            created_by: Set(created_by),
            is_active: Set(true),
            closed_at: Set(None),
            closed_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        attendance_type_id: Option<i64>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find();
        if let Some(type_id) = attendance_type_id {
            query = query.filter(Column::AttendanceTypeId.eq(type_id));
        }
        query
            .order_by_asc(Column::Timestamp)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Closed sessions held within `[start, end]`, optionally restricted to
    /// some attendance types.
    pub async fn find_closed<C: ConnectionTrait>(
        db: &C,
        attendance_type_ids: Option<&[i64]>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find()
            .filter(Column::IsActive.eq(false))
            .filter(Column::Timestamp.between(start, end));
        if let Some(ids) = attendance_type_ids {
            query = query.filter(Column::AttendanceTypeId.is_in(ids.iter().copied()));
        }
        query
            .order_by_asc(Column::Timestamp)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn count_for_type<C: ConnectionTrait>(
        db: &C,
        attendance_type_id: i64,
    ) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::AttendanceTypeId.eq(attendance_type_id))
            .count(db)
            .await
    }

    /// Flips an active session to closed in a single conditional write.
    ///
    /// Returns `false` when nothing changed: the session is missing or was
    /// already closed.
    pub async fn close<C: ConnectionTrait>(
        db: &C,
        id: i64,
        closed_by: i64,
        closed_at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::IsActive, Expr::value(false))
            .col_expr(Column::ClosedAt, Expr::value(Some(closed_at)))
            .col_expr(Column::ClosedBy, Expr::value(Some(closed_by)))
            .col_expr(Column::UpdatedAt, Expr::value(closed_at))
            .filter(Column::Id.eq(id))
            .filter(Column::IsActive.eq(true))
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }
}
