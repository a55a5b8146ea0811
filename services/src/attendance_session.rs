use crate::error::AppError;
use crate::events;
use chrono::{DateTime, Utc};
use db::models::attendance_session_status::{self, StudentStatus};
use db::models::{attendance_session, attendance_type, attendance_type_scope, santri};
use sea_orm::{DbErr, TransactionTrait};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use util::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatusEntry {
    pub status: StudentStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: i64,
}

/// One roll call and the status of every santri on its roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: i64,
    pub attendance_type_id: i64,
    pub timestamp: DateTime<Utc>,
    pub created_by: i64,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<i64>,
    pub student_statuses: BTreeMap<i64, StudentStatusEntry>,
}

impl AttendanceSession {
    fn assemble(
        model: attendance_session::Model,
        rows: impl IntoIterator<Item = attendance_session_status::Model>,
    ) -> Self {
        let student_statuses = rows
            .into_iter()
            .map(|row| {
                (
                    row.santri_id,
                    StudentStatusEntry {
                        status: row.status,
                        updated_at: row.updated_at,
                        updated_by: row.updated_by,
                    },
                )
            })
            .collect();

        Self {
            id: model.id,
            attendance_type_id: model.attendance_type_id,
            timestamp: model.timestamp,
            created_by: model.created_by,
            is_active: model.is_active,
            closed_at: model.closed_at,
            closed_by: model.closed_by,
            student_statuses,
        }
    }

    pub fn status_of(&self, santri_id: i64) -> Option<StudentStatus> {
        self.student_statuses.get(&santri_id).map(|e| e.status)
    }
}

pub struct AttendanceSessionService {
    state: AppState,
}

impl AttendanceSessionService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Opens a session with every listed santri marked `absent`.
    /// Duplicate ids collapse into one roster entry.
    pub async fn open_session(
        &self,
        attendance_type_id: i64,
        created_by: i64,
        student_ids: &[i64],
    ) -> Result<AttendanceSession, AppError> {
        let roster: BTreeSet<i64> = student_ids.iter().copied().collect();
        if roster.is_empty() {
            return Err(AppError::Validation(
                "A session needs at least one santri on its roster".into(),
            ));
        }

        let db = self.state.db();
        if attendance_type::Model::find_by_id(db, attendance_type_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("AttendanceType", attendance_type_id));
        }

        let now = Utc::now();
        let roster: Vec<i64> = roster.into_iter().collect();

        let txn = db.begin().await?;
        let model =
            attendance_session::Model::create(&txn, attendance_type_id, created_by, now).await?;
        attendance_session_status::Model::insert_roster(&txn, model.id, &roster, created_by, now)
            .await?;
        txn.commit().await?;

        let session = self.load(model).await?;
        tracing::info!(
            session_id = session.id,
            attendance_type_id,
            roster = session.student_statuses.len(),
            "Attendance session opened"
        );
        events::session_updated(self.state.feed(), &session).await;

        Ok(session)
    }

    /// Opens a session for one dormitory. The roster is the type's scope
    /// when it has one, otherwise every `aktif` santri of `kode_asrama`.
    /// Scoped santri from other dormitories are left out.
    pub async fn open_session_for_asrama(
        &self,
        attendance_type_id: i64,
        created_by: i64,
        kode_asrama: &str,
    ) -> Result<AttendanceSession, AppError> {
        let db = self.state.db();
        if attendance_type::Model::find_by_id(db, attendance_type_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("AttendanceType", attendance_type_id));
        }

        let scope = attendance_type_scope::Model::ids_for_type(db, attendance_type_id).await?;
        let mut roster = santri::Model::find_aktif_ids_by_asrama(db, kode_asrama).await?;
        if !scope.is_empty() {
            roster.retain(|id| scope.contains(id));
        }

        if roster.is_empty() {
            return Err(AppError::Validation(format!(
                "No santri to take attendance for in asrama {kode_asrama}"
            )));
        }

        self.open_session(attendance_type_id, created_by, &roster)
            .await
    }

    /// Last write wins. Closed sessions are frozen.
    pub async fn set_status(
        &self,
        session_id: i64,
        santri_id: i64,
        status: StudentStatus,
        updated_by: i64,
    ) -> Result<AttendanceSession, AppError> {
        let txn = self.state.db().begin().await?;

        let model = attendance_session::Model::find_by_id(&txn, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("AttendanceSession", session_id))?;

        if model.is_closed() {
            tracing::warn!(session_id, santri_id, "Status write on closed session");
            return Err(AppError::InvalidState(
                "Attendance session is already closed".into(),
            ));
        }

        match attendance_session_status::Model::set_status(
            &txn,
            session_id,
            santri_id,
            status,
            updated_by,
            Utc::now(),
        )
        .await
        {
            Ok(_) => {}
            Err(DbErr::RecordNotFound(_)) => {
                return Err(AppError::not_found("Santri on session roster", santri_id));
            }
            Err(err) => return Err(err.into()),
        }
        txn.commit().await?;

        let session = self.load(model).await?;
        tracing::info!(session_id, santri_id, %status, "Attendance status set");
        events::session_updated(self.state.feed(), &session).await;

        Ok(session)
    }

    /// Freezes the session. Closing twice is `InvalidState`, an unknown id
    /// is `NotFound`.
    pub async fn close_session(
        &self,
        session_id: i64,
        closed_by: i64,
    ) -> Result<AttendanceSession, AppError> {
        let db = self.state.db();

        let closed = attendance_session::Model::close(db, session_id, closed_by, Utc::now()).await?;
        if !closed {
            return match attendance_session::Model::find_by_id(db, session_id).await? {
                None => Err(AppError::not_found("AttendanceSession", session_id)),
                Some(_) => {
                    tracing::warn!(session_id, "Attendance session closed twice");
                    Err(AppError::InvalidState(
                        "Attendance session is already closed".into(),
                    ))
                }
            };
        }

        let session = self.get_session(session_id).await?;
        tracing::info!(
            session_id,
            closed_by,
            roster = session.student_statuses.len(),
            "Attendance session closed"
        );
        events::session_updated(self.state.feed(), &session).await;

        Ok(session)
    }

    /// Loads a session with its full roster.
    pub async fn get_session(&self, session_id: i64) -> Result<AttendanceSession, AppError> {
        let model = attendance_session::Model::find_by_id(self.state.db(), session_id)
            .await?
            .ok_or_else(|| AppError::not_found("AttendanceSession", session_id))?;
        self.load(model).await
    }

    /// Sessions ordered by timestamp, optionally for one attendance type.
    pub async fn list_sessions(
        &self,
        attendance_type_id: Option<i64>,
    ) -> Result<Vec<AttendanceSession>, AppError> {
        let db = self.state.db();
        let models = attendance_session::Model::find_all(db, attendance_type_id).await?;
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();

        let mut rows_by_session: HashMap<i64, Vec<attendance_session_status::Model>> =
            HashMap::new();
        for row in attendance_session_status::Model::find_for_sessions(db, &ids).await? {
            rows_by_session.entry(row.session_id).or_default().push(row);
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let rows = rows_by_session.remove(&m.id).unwrap_or_default();
                AttendanceSession::assemble(m, rows)
            })
            .collect())
    }

    async fn load(&self, model: attendance_session::Model) -> Result<AttendanceSession, AppError> {
        let rows =
            attendance_session_status::Model::find_for_session(self.state.db(), model.id).await?;
        Ok(AttendanceSession::assemble(model, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_type::{AttendanceTypeService, CreateAttendanceType};
    use db::models::santri::StatusAktif;
    use db::test_utils::setup_test_db;
    use util::feed::FeedManager;

    struct Fixture {
        svc: AttendanceSessionService,
        state: AppState,
        type_id: i64,
    }

    async fn fixture() -> Fixture {
        let state = AppState::new(setup_test_db().await, FeedManager::default());
        let attendance_type = AttendanceTypeService::new(state.clone())
            .create_type(CreateAttendanceType::new("Subuh"))
            .await
            .unwrap();
        Fixture {
            svc: AttendanceSessionService::new(state.clone()),
            state,
            type_id: attendance_type.id,
        }
    }

    #[tokio::test]
    async fn open_marks_everyone_absent_and_collapses_duplicates() {
        let f = fixture().await;

        let session = f.svc.open_session(f.type_id, 9, &[4, 2, 4]).await.unwrap();

        assert!(session.is_active);
        assert_eq!(session.created_by, 9);
        assert_eq!(
            session.student_statuses.keys().copied().collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert!(
            session
                .student_statuses
                .values()
                .all(|e| e.status == StudentStatus::Absent)
        );
    }

    #[tokio::test]
    async fn open_rejects_empty_roster_and_unknown_type() {
        let f = fixture().await;

        let empty = f.svc.open_session(f.type_id, 9, &[]).await.unwrap_err();
        assert!(matches!(empty, AppError::Validation(_)));

        let missing = f.svc.open_session(999, 9, &[1]).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn set_status_is_last_write_wins() {
        let f = fixture().await;
        let session = f.svc.open_session(f.type_id, 9, &[1, 2]).await.unwrap();

        f.svc
            .set_status(session.id, 1, StudentStatus::Present, 9)
            .await
            .unwrap();
        let updated = f
            .svc
            .set_status(session.id, 1, StudentStatus::Dispen, 10)
            .await
            .unwrap();

        let entry = &updated.student_statuses[&1];
        assert_eq!(entry.status, StudentStatus::Dispen);
        assert_eq!(entry.updated_by, 10);
        assert_eq!(updated.status_of(2), Some(StudentStatus::Absent));
    }

    #[tokio::test]
    async fn set_status_rejects_unknown_session_and_off_roster_santri() {
        let f = fixture().await;
        let session = f.svc.open_session(f.type_id, 9, &[1]).await.unwrap();

        let no_session = f
            .svc
            .set_status(999, 1, StudentStatus::Present, 9)
            .await
            .unwrap_err();
        assert!(matches!(no_session, AppError::NotFound { entity: "AttendanceSession", .. }));

        let off_roster = f
            .svc
            .set_status(session.id, 5, StudentStatus::Present, 9)
            .await
            .unwrap_err();
        assert!(matches!(off_roster, AppError::NotFound { .. }));

        // The failed writes above must not leave the session unusable.
        f.svc
            .set_status(session.id, 1, StudentStatus::Present, 9)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn closed_session_is_frozen() {
        let f = fixture().await;
        let session = f.svc.open_session(f.type_id, 9, &[1, 2]).await.unwrap();
        let before_close = f
            .svc
            .set_status(session.id, 1, StudentStatus::Present, 9)
            .await
            .unwrap();

        let closed = f.svc.close_session(session.id, 11).await.unwrap();
        assert!(!closed.is_active);
        assert_eq!(closed.closed_by, Some(11));
        assert!(closed.closed_at.is_some());

        for status in [StudentStatus::Absent, StudentStatus::OverridePresent] {
            let err = f.svc.set_status(session.id, 2, status, 9).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }

        let reloaded = f.svc.get_session(session.id).await.unwrap();
        assert_eq!(reloaded.student_statuses, before_close.student_statuses);
    }

    #[tokio::test]
    async fn closing_twice_fails() {
        let f = fixture().await;
        let session = f.svc.open_session(f.type_id, 9, &[1]).await.unwrap();

        f.svc.close_session(session.id, 9).await.unwrap();
        let again = f.svc.close_session(session.id, 9).await.unwrap_err();
        assert!(matches!(again, AppError::InvalidState(_)));

        let missing = f.svc.close_session(999, 9).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn asrama_roster_uses_aktif_santri_or_scope() {
        let f = fixture().await;
        let db = f.state.db();
        let a = santri::Model::create(db, "Aisyah", "A1").await.unwrap();
        let b = santri::Model::create(db, "Fatimah", "A1").await.unwrap();
        let alumni = santri::Model::create(db, "Khadijah", "A1").await.unwrap();
        santri::Model::set_status_aktif(db, alumni.id, StatusAktif::Alumni)
            .await
            .unwrap();
        let other = santri::Model::create(db, "Maryam", "B2").await.unwrap();

        let whole = f
            .svc
            .open_session_for_asrama(f.type_id, 9, "A1")
            .await
            .unwrap();
        assert_eq!(
            whole.student_statuses.keys().copied().collect::<Vec<_>>(),
            vec![a.id, b.id]
        );

        let scoped_type = AttendanceTypeService::new(f.state.clone())
            .create_type(CreateAttendanceType {
                scope: Some(vec![b.id, other.id]),
                ..CreateAttendanceType::new("Tahfidz")
            })
            .await
            .unwrap();
        let scoped = f
            .svc
            .open_session_for_asrama(scoped_type.id, 9, "A1")
            .await
            .unwrap();
        assert_eq!(
            scoped.student_statuses.keys().copied().collect::<Vec<_>>(),
            vec![b.id]
        );

        let empty = f
            .svc
            .open_session_for_asrama(f.type_id, 9, "Z9")
            .await
            .unwrap_err();
        assert!(matches!(empty, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn list_sessions_filters_by_type() {
        let f = fixture().await;
        let other_type = AttendanceTypeService::new(f.state.clone())
            .create_type(CreateAttendanceType::new("Maghrib"))
            .await
            .unwrap();

        let first = f.svc.open_session(f.type_id, 9, &[1]).await.unwrap();
        f.svc.open_session(other_type.id, 9, &[1, 2]).await.unwrap();

        assert_eq!(f.svc.list_sessions(None).await.unwrap().len(), 2);

        let filtered = f.svc.list_sessions(Some(f.type_id)).await.unwrap();
        assert_eq!(filtered, vec![first]);
    }

    #[tokio::test]
    async fn status_writes_are_pushed_on_the_session_topic() {
        let f = fixture().await;
        let session = f.svc.open_session(f.type_id, 9, &[1]).await.unwrap();
        let mut rx = f
            .state
            .feed()
            .subscribe(&format!("AttendanceSessions:{}", session.id))
            .await;

        f.svc
            .set_status(session.id, 1, StudentStatus::Present, 9)
            .await
            .unwrap();

        let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["event"], "attendance.session_updated");
        assert_eq!(msg["payload"]["studentStatuses"]["1"]["status"], "present");
    }
}
