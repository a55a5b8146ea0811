use crate::error::AppError;
use crate::events;
use db::models::{attendance_session, attendance_type, attendance_type_scope};
use sea_orm::TransactionTrait;
use serde::Serialize;
use std::collections::BTreeSet;
use util::state::AppState;
use validator::Validate;

/// A kind of roll call, e.g. "Subuh" or "Kajian Malam".
///
/// `scoped_student_ids` restricts the roster to specific santri; `None` means
/// the whole dormitory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceType {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_frequent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoped_student_ids: Option<BTreeSet<i64>>,
}

impl AttendanceType {
    fn from_parts(model: attendance_type::Model, scope: BTreeSet<i64>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            is_frequent: model.is_frequent,
            scoped_student_ids: if scope.is_empty() { None } else { Some(scope) },
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct CreateAttendanceType {
    #[validate(length(min = 1, message = "Attendance type name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
    pub is_frequent: bool,
    /// Santri the roster is limited to. Leave it `None` for the whole
    /// dormitory; an empty list is refused.
    #[validate(length(min = 1, message = "Scope must list at least one santri"))]
    pub scope: Option<Vec<i64>>,
}

impl CreateAttendanceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_frequent: false,
            scope: None,
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateAttendanceType {
    #[validate(length(min = 1, message = "Attendance type name must not be empty"))]
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// CRUD over attendance types and their roster scope.
pub struct AttendanceTypeService {
    state: AppState,
}

impl AttendanceTypeService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Creates the type and its scope in one transaction.
    ///
    /// # Arguments
    ///
    /// * `params` - The name is trimmed before validation. Duplicate scope
    ///   ids collapse into one entry.
    pub async fn create_type(
        &self,
        mut params: CreateAttendanceType,
    ) -> Result<AttendanceType, AppError> {
        params.name = params.name.trim().to_owned();
        params.validate()?;

        let scope: BTreeSet<i64> = params.scope.unwrap_or_default().into_iter().collect();

        let txn = self.state.db().begin().await?;
        let model = attendance_type::Model::create(
            &txn,
            &params.name,
            params.description.as_deref(),
            params.is_frequent,
        )
        .await?;
        attendance_type_scope::Model::replace_for_type(&txn, model.id, &scope).await?;
        txn.commit().await?;

        let created = AttendanceType::from_parts(model, scope);
        tracing::info!(
            attendance_type_id = created.id,
            name = %created.name,
            "Attendance type created"
        );
        events::attendance_type_upserted(self.state.feed(), &created).await;

        Ok(created)
    }

    /// Every type ordered by id, each with its scope.
    pub async fn list_types(&self) -> Result<Vec<AttendanceType>, AppError> {
        let db = self.state.db();
        let models = attendance_type::Model::find_all(db).await?;
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut scopes = attendance_type_scope::Model::ids_for_types(db, &ids).await?;

        Ok(models
            .into_iter()
            .map(|m| {
                let scope = scopes.remove(&m.id).unwrap_or_default();
                AttendanceType::from_parts(m, scope)
            })
            .collect())
    }

    pub async fn get_type(&self, id: i64) -> Result<AttendanceType, AppError> {
        let db = self.state.db();
        let model = attendance_type::Model::find_by_id(db, id)
            .await?
            .ok_or_else(|| AppError::not_found("AttendanceType", id))?;
        let scope = attendance_type_scope::Model::ids_for_type(db, id).await?;
        Ok(AttendanceType::from_parts(model, scope))
    }

    /// Renames or re-describes a type. The scope is fixed at creation.
    pub async fn update_type(
        &self,
        id: i64,
        mut params: UpdateAttendanceType,
    ) -> Result<AttendanceType, AppError> {
        if let Some(name) = params.name.as_mut() {
            *name = name.trim().to_owned();
        }
        params.validate()?;

        let db = self.state.db();
        if attendance_type::Model::find_by_id(db, id).await?.is_none() {
            return Err(AppError::not_found("AttendanceType", id));
        }

        let description = params.description.as_ref().map(|d| d.as_deref());
        attendance_type::Model::update_details(db, id, params.name.as_deref(), description)
            .await?;

        let updated = self.get_type(id).await?;
        tracing::info!(attendance_type_id = id, "Attendance type updated");
        events::attendance_type_upserted(self.state.feed(), &updated).await;

        Ok(updated)
    }

    /// Fails with [`AppError::InvalidState`] while any session references
    /// the type.
    pub async fn delete_type(&self, id: i64) -> Result<(), AppError> {
        let db = self.state.db();

        if attendance_type::Model::find_by_id(db, id).await?.is_none() {
            return Err(AppError::not_found("AttendanceType", id));
        }

        // The session foreign key is ON DELETE RESTRICT, so a session opened
        // after this count still blocks the delete below.
        let sessions = attendance_session::Model::count_for_type(db, id).await?;
        if sessions > 0 {
            tracing::warn!(
                attendance_type_id = id,
                sessions,
                "Refused to delete attendance type still in use"
            );
            return Err(AppError::InvalidState(format!(
                "Attendance type is used by {sessions} session(s)"
            )));
        }

        attendance_type::Model::delete_by_id(db, id).await?;

        tracing::info!(attendance_type_id = id, "Attendance type deleted");
        events::attendance_type_deleted(self.state.feed(), id).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_session::AttendanceSessionService;
    use db::models::santri;
    use db::test_utils::setup_test_db;
    use util::feed::FeedManager;

    async fn service() -> (AttendanceTypeService, AppState) {
        let state = AppState::new(setup_test_db().await, FeedManager::default());
        (AttendanceTypeService::new(state.clone()), state)
    }

    #[tokio::test]
    async fn created_type_is_listed_once_with_all_fields() {
        let (svc, _) = service().await;

        let created = svc
            .create_type(CreateAttendanceType {
                name: "  Subuh ".into(),
                description: Some("Sholat berjamaah".into()),
                is_frequent: true,
                scope: Some(vec![3, 1, 3]),
            })
            .await
            .unwrap();

        let listed = svc.list_types().await.unwrap();
        let matches: Vec<_> = listed.iter().filter(|t| t.id == created.id).collect();
        assert_eq!(matches.len(), 1);

        let found = matches[0];
        assert_eq!(found.name, "Subuh");
        assert_eq!(found.description.as_deref(), Some("Sholat berjamaah"));
        assert!(found.is_frequent);
        assert_eq!(found.scoped_student_ids, Some(BTreeSet::from([1, 3])));
        assert_eq!(found, &created);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (svc, _) = service().await;

        let err = svc
            .create_type(CreateAttendanceType::new("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(svc.list_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_scope_is_rejected_and_nothing_is_stored() {
        let (svc, _) = service().await;
        let mut params = CreateAttendanceType::new("Kajian Malam");
        params.scope = Some(vec![]);

        let err = svc.create_type(params).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("Scope")));
        assert!(svc.list_types().await.unwrap().is_empty());

        let unscoped = svc
            .create_type(CreateAttendanceType::new("Kajian Malam"))
            .await
            .unwrap();
        assert_eq!(unscoped.scoped_student_ids, None);
    }

    #[tokio::test]
    async fn update_renames_and_clears_description() {
        let (svc, _) = service().await;
        let mut params = CreateAttendanceType::new("Maghrib");
        params.description = Some("old".into());
        let created = svc.create_type(params).await.unwrap();

        let updated = svc
            .update_type(
                created.id,
                UpdateAttendanceType {
                    name: Some("Isya".into()),
                    description: Some(None),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Isya");
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn update_rejects_blank_name_and_unknown_id() {
        let (svc, _) = service().await;
        let created = svc
            .create_type(CreateAttendanceType::new("Dzuhur"))
            .await
            .unwrap();

        let blank = svc
            .update_type(
                created.id,
                UpdateAttendanceType {
                    name: Some(" ".into()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(blank, AppError::Validation(_)));

        let missing = svc
            .update_type(999, UpdateAttendanceType::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_missing_type_is_not_found() {
        let (svc, _) = service().await;
        let err = svc.get_type(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "AttendanceType", .. }));
    }

    #[tokio::test]
    async fn delete_is_refused_while_sessions_reference_the_type() {
        let (svc, state) = service().await;
        let unused = svc
            .create_type(CreateAttendanceType::new("Ashar"))
            .await
            .unwrap();
        let used = svc
            .create_type(CreateAttendanceType::new("Subuh"))
            .await
            .unwrap();
        let santri = santri::Model::create(state.db(), "Aisyah", "A1").await.unwrap();

        AttendanceSessionService::new(state.clone())
            .open_session(used.id, 7, &[santri.id])
            .await
            .unwrap();

        svc.delete_type(unused.id).await.unwrap();
        let err = svc.delete_type(used.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let remaining: Vec<i64> = svc
            .list_types()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(remaining, vec![used.id]);
    }

    #[tokio::test]
    async fn mutations_are_pushed_on_the_types_topic() {
        let (svc, state) = service().await;
        let mut rx = state.feed().subscribe("AttendanceTypes").await;

        let created = svc
            .create_type(CreateAttendanceType::new("Subuh"))
            .await
            .unwrap();
        svc.delete_type(created.id).await.unwrap();

        let upserted: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(upserted["event"], "attendance_type.upserted");
        assert_eq!(upserted["payload"]["name"], "Subuh");

        let deleted: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(deleted["event"], "attendance_type.deleted");
        assert_eq!(deleted["payload"]["attendanceTypeId"], created.id);
    }
}
