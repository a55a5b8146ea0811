use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One entry of a session's `studentStatuses` map. A session's roster is
/// exactly the set of rows carrying its id.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "AttendanceSessionStatuses")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub santri_id: i64,
    pub status: StudentStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: i64,
}

/// Per-santri outcome of a session.
///
/// `OverridePresent` is a manual correction kept distinct from `Present` so
/// the audit trail (`updated_by`, `updated_at`) shows who overrode it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "student_status")]
#[strum(serialize_all = "camelCase")]
pub enum StudentStatus {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "excusedSick")]
    ExcusedSick,
    #[sea_orm(string_value = "excusedPulang")]
    ExcusedPulang,
    #[sea_orm(string_value = "overridePresent")]
    OverridePresent,
    #[sea_orm(string_value = "dispen")]
    Dispen,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Seeds the roster of a freshly opened session, everyone `Absent`.
    pub async fn insert_roster<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        santri_ids: &[i64],
        updated_by: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        if santri_ids.is_empty() {
            return Ok(());
        }

        let rows = santri_ids.iter().map(|santri_id| ActiveModel {
            session_id: Set(session_id),
            santri_id: Set(*santri_id),
            status: Set(StudentStatus::Absent),
            updated_at: Set(at),
            updated_by: Set(updated_by),
        });
        Entity::insert_many(rows).exec_without_returning(db).await?;
        Ok(())
    }

    pub async fn find_one<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        santri_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id((session_id, santri_id)).one(db).await
    }

    pub async fn find_for_session<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_asc(Column::SantriId)
            .all(db)
            .await
    }

    pub async fn find_for_sessions<C: ConnectionTrait>(
        db: &C,
        session_ids: &[i64],
    ) -> Result<Vec<Model>, DbErr> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::SessionId.is_in(session_ids.iter().copied()))
            .order_by_asc(Column::SessionId)
            .order_by_asc(Column::SantriId)
            .all(db)
            .await
    }

    /// Overwrites the status of one roster entry (last write wins).
    pub async fn set_status<C: ConnectionTrait>(
        db: &C,
        session_id: i64,
        santri_id: i64,
        status: StudentStatus,
        updated_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let model = Self::find_one(db, session_id, santri_id)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!(
                    "Santri {santri_id} is not on the roster of session {session_id}"
                ))
            })?;

        let mut active_model: ActiveModel = model.into();
        active_model.status = Set(status);
        active_model.updated_at = Set(at);
        active_model.updated_by = Set(updated_by);
        active_model.update(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance_session, attendance_type};
    use crate::test_utils::setup_test_db;
    use std::str::FromStr;

    #[tokio::test]
    async fn roster_defaults_to_absent_and_accepts_overwrites() {
        let db = setup_test_db().await;
        let t = attendance_type::Model::create(&db, "Isya", None, true)
            .await
            .unwrap();
        let s = attendance_session::Model::create(&db, t.id, 1, Utc::now())
            .await
            .unwrap();

        Model::insert_roster(&db, s.id, &[10, 11], 1, Utc::now())
            .await
            .unwrap();

        let roster = Model::find_for_session(&db, s.id).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().all(|r| r.status == StudentStatus::Absent));

        Model::set_status(&db, s.id, 10, StudentStatus::Present, 5, Utc::now())
            .await
            .unwrap();
        let updated = Model::set_status(&db, s.id, 10, StudentStatus::Dispen, 6, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.status, StudentStatus::Dispen);
        assert_eq!(updated.updated_by, 6);
    }

    #[tokio::test]
    async fn set_status_off_roster_is_record_not_found() {
        let db = setup_test_db().await;
        let t = attendance_type::Model::create(&db, "Isya", None, true)
            .await
            .unwrap();
        let s = attendance_session::Model::create(&db, t.id, 1, Utc::now())
            .await
            .unwrap();

        let err = Model::set_status(&db, s.id, 99, StudentStatus::Present, 1, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbErr::RecordNotFound(_)));
    }

    #[test]
    fn status_strings_are_camel_case() {
        assert_eq!(StudentStatus::ExcusedPulang.to_string(), "excusedPulang");
        assert_eq!(
            StudentStatus::from_str("overridePresent").unwrap(),
            StudentStatus::OverridePresent
        );
        assert!(StudentStatus::from_str("late").is_err());
        assert_eq!(
            serde_json::to_string(&StudentStatus::ExcusedSick).unwrap(),
            "\"excusedSick\""
        );
    }
}
