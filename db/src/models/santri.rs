use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A santri record in `SantriCollection`.
///
/// The `kepulangan_*` columns are the flattened `statusKepulangan` projection.
/// They are written only by the leave lifecycle and the staff override; read
/// them through [`Model::status_kepulangan`] or [`Model::leave_status`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "SantriCollection")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub nama: String,
    pub kode_asrama: String,
    pub status_aktif: StatusAktif,
    pub status_kehadiran: StatusKehadiran,
    #[serde(skip)]
    pub kepulangan_alasan: Option<String>,
    #[serde(skip)]
    pub kepulangan_pemberi_izin: Option<i64>,
    #[serde(skip)]
    pub kepulangan_rencana_kembali: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub kepulangan_sudah_kembali: Option<bool>,
    #[serde(skip)]
    pub kepulangan_tgl_pulang: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub kepulangan_overridden_by: Option<i64>,
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
#[serde(rename_all = "camelCase")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "status_aktif")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatusAktif {
    #[sea_orm(string_value = "aktif")]
    Aktif,
    #[sea_orm(string_value = "non_aktif")]
    NonAktif,
    #[sea_orm(string_value = "alumni")]
    Alumni,
}

/// Whether the santri is currently in the asrama.
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
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "status_kehadiran")]
#[strum(ascii_case_insensitive)]
pub enum StatusKehadiran {
    #[sea_orm(string_value = "Ada")]
    Ada,
    #[sea_orm(string_value = "Sakit")]
    Sakit,
    #[sea_orm(string_value = "Pulang")]
    Pulang,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusKepulangan {
    pub alasan: String,
    pub pemberi_izin: i64,
    pub rencana_tanggal_kembali: DateTime<Utc>,
    pub sudah_kembali: bool,
    pub tgl_pulang: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overridden_by: Option<i64>,
}

/// The leave projection of a santri as listeners see it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SantriLeaveStatus {
    pub student_id: i64,
    pub status_kehadiran: StatusKehadiran,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_kepulangan: Option<StatusKepulangan>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::izin_sakit_pulang::Entity")]
    IzinSakitPulang,
}

impl Related<super::izin_sakit_pulang::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IzinSakitPulang.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status_kepulangan(&self) -> Option<StatusKepulangan> {
        Some(StatusKepulangan {
            alasan: self.kepulangan_alasan.clone()?,
            pemberi_izin: self.kepulangan_pemberi_izin?,
            rencana_tanggal_kembali: self.kepulangan_rencana_kembali?,
            sudah_kembali: self.kepulangan_sudah_kembali?,
            tgl_pulang: self.kepulangan_tgl_pulang?,
            overridden_by: self.kepulangan_overridden_by,
        })
    }

    /// True while a kepulangan is open, i.e. the santri left on an approved
    /// leave and has not been marked back.
    pub fn is_away(&self) -> bool {
        self.kepulangan_sudah_kembali == Some(false)
    }

    pub fn leave_status(&self) -> SantriLeaveStatus {
        SantriLeaveStatus {
            student_id: self.id,
            status_kehadiran: self.status_kehadiran,
            status_kepulangan: self.status_kepulangan(),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        nama: &str,
        kode_asrama: &str,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        let active_model = ActiveModel {
            nama: Set(nama.to_owned()),
            kode_asrama: Set(kode_asrama.to_owned()),
            status_aktif: Set(StatusAktif::Aktif),
            status_kehadiran: Set(StatusKehadiran::Ada),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_by_ids<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<Vec<Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Entity::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn find_by_asrama<C: ConnectionTrait>(
        db: &C,
        kode_asrama: &str,
        status_kehadiran: Option<StatusKehadiran>,
    ) -> Result<Vec<Model>, DbErr> {
        let mut query = Entity::find().filter(Column::KodeAsrama.eq(kode_asrama));

        if let Some(status) = status_kehadiran {
            query = query.filter(Column::StatusKehadiran.eq(status));
        }

        query.order_by_asc(Column::Id).all(db).await
    }

    pub async fn find_aktif_ids_by_asrama<C: ConnectionTrait>(
        db: &C,
        kode_asrama: &str,
    ) -> Result<Vec<i64>, DbErr> {
        let santri = Entity::find()
            .filter(Column::KodeAsrama.eq(kode_asrama))
            .filter(Column::StatusAktif.eq(StatusAktif::Aktif))
            .order_by_asc(Column::Id)
            .all(db)
            .await?;
        Ok(santri.into_iter().map(|s| s.id).collect())
    }

    /// Santri of `kode_asrama` with a kepulangan that has not been closed.
    pub async fn find_away_by_asrama<C: ConnectionTrait>(
        db: &C,
        kode_asrama: &str,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::KodeAsrama.eq(kode_asrama))
            .filter(Column::KepulanganSudahKembali.eq(false))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn set_status_aktif<C: ConnectionTrait>(
        db: &C,
        id: i64,
        status: StatusAktif,
    ) -> Result<Model, DbErr> {
        let model = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Santri {id} not found")))?;

        let mut active_model: ActiveModel = model.into();
        active_model.status_aktif = Set(status);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    /// Writes a fresh `statusKepulangan` for an approved leave.
    pub async fn record_departure<C: ConnectionTrait>(
        db: &C,
        id: i64,
        status_kehadiran: StatusKehadiran,
        alasan: &str,
        pemberi_izin: i64,
        rencana_tanggal_kembali: DateTime<Utc>,
        tgl_pulang: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let model = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Santri {id} not found")))?;

        let mut active_model: ActiveModel = model.into();
        active_model.status_kehadiran = Set(status_kehadiran);
        active_model.kepulangan_alasan = Set(Some(alasan.to_owned()));
        active_model.kepulangan_pemberi_izin = Set(Some(pemberi_izin));
        active_model.kepulangan_rencana_kembali = Set(Some(rencana_tanggal_kembali));
        active_model.kepulangan_sudah_kembali = Set(Some(false));
        active_model.kepulangan_tgl_pulang = Set(Some(tgl_pulang));
        active_model.kepulangan_overridden_by = Set(None);
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }

    /// Marks the santri back in the asrama. `overridden_by` is set when staff
    /// forced the return instead of the leave application recording it.
    pub async fn record_return<C: ConnectionTrait>(
        db: &C,
        id: i64,
        overridden_by: Option<i64>,
    ) -> Result<Model, DbErr> {
        let model = Self::find_by_id(db, id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("Santri {id} not found")))?;

        let mut active_model: ActiveModel = model.into();
        active_model.status_kehadiran = Set(StatusKehadiran::Ada);
        active_model.kepulangan_sudah_kembali = Set(Some(true));
        if overridden_by.is_some() {
            active_model.kepulangan_overridden_by = Set(overridden_by);
        }
        active_model.updated_at = Set(Utc::now());
        active_model.update(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::Duration;

    #[tokio::test]
    async fn create_defaults_to_aktif_and_ada() {
        let db = setup_test_db().await;

        let santri = Model::create(&db, "Aisyah", "A1").await.unwrap();

        assert_eq!(santri.status_aktif, StatusAktif::Aktif);
        assert_eq!(santri.status_kehadiran, StatusKehadiran::Ada);
        assert!(santri.status_kepulangan().is_none());
    }

    #[tokio::test]
    async fn find_by_asrama_filters_on_kehadiran() {
        let db = setup_test_db().await;
        let a = Model::create(&db, "Aisyah", "A1").await.unwrap();
        let b = Model::create(&db, "Fatimah", "A1").await.unwrap();
        Model::create(&db, "Khadijah", "B2").await.unwrap();

        let now = Utc::now();
        Model::record_departure(
            &db,
            b.id,
            StatusKehadiran::Pulang,
            "Acara keluarga",
            9,
            now + Duration::days(2),
            now,
        )
        .await
        .unwrap();

        let all = Model::find_by_asrama(&db, "A1", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let ada = Model::find_by_asrama(&db, "A1", Some(StatusKehadiran::Ada))
            .await
            .unwrap();
        assert_eq!(ada.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a.id]);

        let away = Model::find_away_by_asrama(&db, "A1").await.unwrap();
        assert_eq!(away.iter().map(|s| s.id).collect::<Vec<_>>(), vec![b.id]);
    }

    #[tokio::test]
    async fn record_return_closes_kepulangan() {
        let db = setup_test_db().await;
        let s = Model::create(&db, "Maryam", "A1").await.unwrap();
        let now = Utc::now();

        let away = Model::record_departure(
            &db,
            s.id,
            StatusKehadiran::Sakit,
            "Demam",
            4,
            now + Duration::days(1),
            now,
        )
        .await
        .unwrap();
        assert!(away.is_away());
        let back = Model::record_return(&db, s.id, Some(12)).await.unwrap();

        assert_eq!(back.status_kehadiran, StatusKehadiran::Ada);
        assert!(!back.is_away());
        let kepulangan = back.status_kepulangan().unwrap();
        assert!(kepulangan.sudah_kembali);
        assert_eq!(kepulangan.overridden_by, Some(12));
        assert_eq!(kepulangan.pemberi_izin, 4);
    }

    #[tokio::test]
    async fn aktif_ids_skip_alumni() {
        let db = setup_test_db().await;
        let a = Model::create(&db, "Aisyah", "A1").await.unwrap();
        let b = Model::create(&db, "Hafsah", "A1").await.unwrap();
        Model::set_status_aktif(&db, b.id, StatusAktif::Alumni).await.unwrap();

        let ids = Model::find_aktif_ids_by_asrama(&db, "A1").await.unwrap();
        assert_eq!(ids, vec![a.id]);
    }

    #[test]
    fn leave_status_serializes_in_document_shape() {
        let now = Utc::now();
        let model = Model {
            id: 3,
            nama: "Aisyah".into(),
            kode_asrama: "A1".into(),
            status_aktif: StatusAktif::Aktif,
            status_kehadiran: StatusKehadiran::Pulang,
            kepulangan_alasan: Some("Libur".into()),
            kepulangan_pemberi_izin: Some(8),
            kepulangan_rencana_kembali: Some(now),
            kepulangan_sudah_kembali: Some(false),
            kepulangan_tgl_pulang: Some(now),
            kepulangan_overridden_by: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(model.leave_status()).unwrap();
        assert_eq!(json["studentId"], 3);
        assert_eq!(json["statusKehadiran"], "Pulang");
        assert_eq!(json["statusKepulangan"]["alasan"], "Libur");
        assert_eq!(json["statusKepulangan"]["sudahKembali"], false);
        assert!(json["statusKepulangan"].get("overriddenBy").is_none());
    }
}
