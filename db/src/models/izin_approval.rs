use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One decision in the ordered approval history of a leave application.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "IzinSakitPulangApprovals")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub izin_id: i64,
    pub role: Role,
    pub approver_id: i64,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

/// Role of whoever acts on attendance and leave records.
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
#[serde(rename_all = "camelCase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "actor_role")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "santri")]
    Santri,
    #[sea_orm(string_value = "waliSantri")]
    WaliSantri,
    #[sea_orm(string_value = "pengurus")]
    Pengurus,
    #[sea_orm(string_value = "ustadzah")]
    Ustadzah,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Santri and their guardians file leave applications.
    pub fn can_submit_izin(self) -> bool {
        matches!(self, Self::Santri | Self::WaliSantri)
    }

    /// Reviews applications in `PendingUstadzahReview`.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Self::Pengurus)
    }

    /// Decides applications in `PendingUstadzahApproval`.
    pub fn is_approver(self) -> bool {
        matches!(self, Self::Ustadzah)
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Self::Pengurus | Self::Ustadzah | Self::Admin)
    }
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_decision")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::izin_sakit_pulang::Entity",
        from = "Column::IzinId",
        to = "super::izin_sakit_pulang::Column::Id"
    )]
    Izin,
}

impl Related<super::izin_sakit_pulang::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Izin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        izin_id: i64,
        role: Role,
        approver_id: i64,
        decision: Decision,
        timestamp: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            izin_id: Set(izin_id),
            role: Set(role),
            approver_id: Set(approver_id),
            decision: Set(decision),
            timestamp: Set(timestamp),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    /// Approval history of one application, oldest first.
    pub async fn find_for_izin<C: ConnectionTrait>(
        db: &C,
        izin_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::IzinId.eq(izin_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_santri_side_submits() {
        assert!(Role::Santri.can_submit_izin());
        assert!(Role::WaliSantri.can_submit_izin());
        assert!(!Role::Pengurus.can_submit_izin());
        assert!(!Role::Ustadzah.can_submit_izin());
        assert!(!Role::Admin.can_submit_izin());
    }

    #[test]
    fn reviewer_and_approver_are_distinct() {
        assert!(Role::Pengurus.is_reviewer());
        assert!(!Role::Pengurus.is_approver());
        assert!(Role::Ustadzah.is_approver());
        assert!(!Role::Ustadzah.is_reviewer());
        assert!(Role::Admin.is_staff());
        assert!(!Role::WaliSantri.is_staff());
    }
}
