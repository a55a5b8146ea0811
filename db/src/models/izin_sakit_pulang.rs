use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A leave application (izin sakit / izin pulang).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "IzinSakitPulang")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub santri_id: i64,
    pub created_by: i64,
    pub reason: String,
    #[serde(rename = "type")]
    pub izin_type: IzinType,
    pub status: IzinStatus,
    pub leave_date: DateTime<Utc>,
    pub requested_return_date: DateTime<Utc>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "izin_type")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IzinType {
    #[sea_orm(string_value = "sick")]
    Sick,
    #[sea_orm(string_value = "pulang")]
    Pulang,
}

/// Workflow state of a leave application.
///
/// ```text
/// PendingUstadzahReview -> PendingUstadzahApproval -> Approved -> Returned
///          |                         |
///          +-------> Rejected <------+
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "izin_status")]
pub enum IzinStatus {
    #[sea_orm(string_value = "PendingUstadzahReview")]
    PendingUstadzahReview,
    #[sea_orm(string_value = "PendingUstadzahApproval")]
    PendingUstadzahApproval,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Returned")]
    Returned,
    #[sea_orm(string_value = "Rejected")]
    Rejected,
}

impl IzinStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingUstadzahReview, Self::PendingUstadzahApproval)
                | (Self::PendingUstadzahReview, Self::Rejected)
                | (Self::PendingUstadzahApproval, Self::Approved)
                | (Self::PendingUstadzahApproval, Self::Rejected)
                | (Self::Approved, Self::Returned)
        )
    }

    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::PendingUstadzahReview | Self::PendingUstadzahApproval
        )
    }

    /// Only pending applications may be withdrawn.
    pub fn can_delete(self) -> bool {
        self.is_pending()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::santri::Entity",
        from = "Column::SantriId",
        to = "super::santri::Column::Id"
    )]
    Santri,
    #[sea_orm(has_many = "super::izin_approval::Entity")]
    Approvals,
}

impl Related<super::santri::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Santri.def()
    }
}

impl Related<super::izin_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approvals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        santri_id: i64,
        created_by: i64,
        reason: &str,
        izin_type: IzinType,
        leave_date: DateTime<Utc>,
        requested_return_date: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            santri_id: Set(santri_id),
            created_by: Set(created_by),
            reason: Set(reason.to_owned()),
            izin_type: Set(izin_type),
            status: Set(IzinStatus::PendingUstadzahReview),
            leave_date: Set(leave_date),
            requested_return_date: Set(requested_return_date),
            actual_return_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_santri<C: ConnectionTrait>(
        db: &C,
        santri_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SantriId.eq(santri_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    pub async fn find_by_status<C: ConnectionTrait>(
        db: &C,
        status: IzinStatus,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.eq(status))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Approved applications of the santri that have not been closed by a
    /// return yet.
    pub async fn find_open_for_santri<C: ConnectionTrait>(
        db: &C,
        santri_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SantriId.eq(santri_id))
            .filter(Column::Status.eq(IzinStatus::Approved))
            .filter(Column::ActualReturnDate.is_null())
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Moves the application from `from` to `to` only if it is still in
    /// `from`. Returns `false` when another writer got there first.
    pub async fn transition<C: ConnectionTrait>(
        db: &C,
        id: i64,
        from: IzinStatus,
        to: IzinStatus,
        actual_return_date: Option<DateTime<Utc>>,
    ) -> Result<bool, DbErr> {
        let mut update = Entity::update_many()
            .col_expr(Column::Status, Expr::value(to))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(returned_at) = actual_return_date {
            update = update.col_expr(Column::ActualReturnDate, Expr::value(Some(returned_at)));
        }

        let result = update
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(from))
            .exec(db)
            .await?;
        Ok(result.rows_affected == 1)
    }

    pub async fn delete_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<bool, DbErr> {
        let result = Entity::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }
}
