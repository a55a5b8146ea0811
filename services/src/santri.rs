use crate::error::AppError;
use crate::overdue;
use chrono::{DateTime, Utc};
use db::models::santri::{self, SantriLeaveStatus, StatusAktif, StatusKehadiran};
use serde::Serialize;
use util::state::AppState;
use validator::Validate;

pub use db::models::santri::Model as Santri;

#[derive(Debug, Clone, Validate)]
pub struct CreateSantri {
    #[validate(length(min = 1, message = "Nama must not be empty"))]
    pub nama: String,
    #[validate(length(min = 1, message = "Kode asrama must not be empty"))]
    pub kode_asrama: String,
}

/// A santri still away past the planned return date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueSantri {
    pub santri_id: i64,
    pub nama: String,
    pub status_kehadiran: StatusKehadiran,
    pub rencana_tanggal_kembali: DateTime<Utc>,
    pub days_late: i64,
}

/// Santri records and the leave projection read side.
pub struct SantriService {
    state: AppState,
}

impl SantriService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Registers a santri as `aktif` and `Ada`. Both fields are trimmed first.
    pub async fn create_santri(&self, mut params: CreateSantri) -> Result<Santri, AppError> {
        params.nama = params.nama.trim().to_owned();
        params.kode_asrama = params.kode_asrama.trim().to_owned();
        params.validate()?;

        let created = santri::Model::create(self.state.db(), &params.nama, &params.kode_asrama)
            .await?;
        tracing::info!(
            santri_id = created.id,
            kode_asrama = %created.kode_asrama,
            "Santri registered"
        );
        Ok(created)
    }

    pub async fn get_santri(&self, id: i64) -> Result<Santri, AppError> {
        santri::Model::find_by_id(self.state.db(), id)
            .await?
            .ok_or_else(|| AppError::not_found("Santri", id))
    }

    /// The `statusKehadiran`/`statusKepulangan` pair listeners receive.
    pub async fn leave_status(&self, id: i64) -> Result<SantriLeaveStatus, AppError> {
        Ok(self.get_santri(id).await?.leave_status())
    }

    /// Santri of one asrama ordered by id.
    ///
    /// # Arguments
    ///
    /// * `kode_asrama` - Exact asrama code, e.g. `"A1"`.
    /// * `status_kehadiran` - Keep only santri in this state when given.
    pub async fn list_by_asrama(
        &self,
        kode_asrama: &str,
        status_kehadiran: Option<StatusKehadiran>,
    ) -> Result<Vec<Santri>, AppError> {
        Ok(santri::Model::find_by_asrama(self.state.db(), kode_asrama, status_kehadiran).await?)
    }

    /// Alumni and `non_aktif` santri drop out of new asrama rosters.
    pub async fn set_status_aktif(
        &self,
        id: i64,
        status: StatusAktif,
    ) -> Result<Santri, AppError> {
        self.get_santri(id).await?;
        let updated = santri::Model::set_status_aktif(self.state.db(), id, status).await?;
        tracing::info!(santri_id = id, %status, "Santri status aktif changed");
        Ok(updated)
    }

    /// Santri of `kode_asrama` whose planned return date has passed at `now`.
    pub async fn list_overdue(
        &self,
        kode_asrama: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<OverdueSantri>, AppError> {
        let away = santri::Model::find_away_by_asrama(self.state.db(), kode_asrama).await?;

        Ok(away
            .into_iter()
            .filter_map(|s| {
                let kepulangan = s.status_kepulangan()?;
                let late = overdue::lateness(&now, &kepulangan.rencana_tanggal_kembali)?;
                Some(OverdueSantri {
                    santri_id: s.id,
                    nama: s.nama,
                    status_kehadiran: s.status_kehadiran,
                    rencana_tanggal_kembali: kepulangan.rencana_tanggal_kembali,
                    days_late: late.days_late,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use db::test_utils::setup_test_db;
    use util::feed::FeedManager;

    async fn service() -> SantriService {
        SantriService::new(AppState::new(setup_test_db().await, FeedManager::default()))
    }

    fn params(nama: &str, kode_asrama: &str) -> CreateSantri {
        CreateSantri {
            nama: nama.into(),
            kode_asrama: kode_asrama.into(),
        }
    }

    #[tokio::test]
    async fn create_trims_and_rejects_blank_fields() {
        let svc = service().await;

        let created = svc.create_santri(params(" Aisyah ", "A1")).await.unwrap();
        assert_eq!(created.nama, "Aisyah");
        assert_eq!(created.status_kehadiran, StatusKehadiran::Ada);

        let err = svc.create_santri(params("  ", "A1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("Nama")));

        let err = svc.create_santri(params("Fatimah", "")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn list_by_asrama_filters_by_kehadiran() {
        let svc = service().await;
        let db = svc.state.db();
        let here = svc.create_santri(params("Aisyah", "A1")).await.unwrap();
        let sick = svc.create_santri(params("Fatimah", "A1")).await.unwrap();
        svc.create_santri(params("Maryam", "B2")).await.unwrap();
        let now = Utc::now();
        santri::Model::record_departure(db, sick.id, StatusKehadiran::Sakit, "demam", 3, now, now)
            .await
            .unwrap();

        let all = svc.list_by_asrama("A1", None).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![here.id, sick.id]
        );

        let sakit = svc
            .list_by_asrama("A1", Some(StatusKehadiran::Sakit))
            .await
            .unwrap();
        assert_eq!(sakit.iter().map(|s| s.id).collect::<Vec<_>>(), vec![sick.id]);
    }

    #[tokio::test]
    async fn overdue_lists_only_late_unreturned_santri() {
        let svc = service().await;
        let db = svc.state.db();
        let now = Utc::now();

        let late = svc.create_santri(params("Aisyah", "A1")).await.unwrap();
        let on_time = svc.create_santri(params("Fatimah", "A1")).await.unwrap();
        let back = svc.create_santri(params("Khadijah", "A1")).await.unwrap();

        for (id, due) in [
            (late.id, now - Duration::days(3)),
            (on_time.id, now + Duration::days(1)),
            (back.id, now - Duration::days(5)),
        ] {
            santri::Model::record_departure(
                db,
                id,
                StatusKehadiran::Pulang,
                "acara keluarga",
                3,
                due,
                now - Duration::days(7),
            )
            .await
            .unwrap();
        }
        santri::Model::record_return(db, back.id, None).await.unwrap();

        let overdue = svc.list_overdue("A1", now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].santri_id, late.id);
        assert_eq!(overdue[0].days_late, 3);
    }

    #[tokio::test]
    async fn missing_santri_is_not_found() {
        let svc = service().await;
        let err = svc.leave_status(77).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "Santri", .. }));
    }
}
