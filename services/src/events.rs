//! Change events pushed on the feed after every successful write.
//!
//! Each payload is the complete latest snapshot of the document so listeners
//! replace their copy outright.

use serde::Serialize;
use util::feed::{Event, FeedManager, emit};

use crate::attendance_session::AttendanceSession;
use crate::attendance_type::AttendanceType;
use crate::izin::LeaveApplication;
use db::models::santri::SantriLeaveStatus;

pub mod topics {
    pub fn attendance_types() -> String {
        "AttendanceTypes".to_string()
    }

    pub fn attendance_sessions() -> String {
        "AttendanceSessions".to_string()
    }

    pub fn attendance_session(session_id: i64) -> String {
        format!("AttendanceSessions:{session_id}")
    }

    pub fn izin_for_santri(santri_id: i64) -> String {
        format!("IzinSakitPulang:santri:{santri_id}")
    }

    pub fn santri_for_asrama(kode_asrama: &str) -> String {
        format!("SantriCollection:kodeAsrama:{kode_asrama}")
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceTypeUpserted<'a> {
    #[serde(flatten)]
    pub attendance_type: &'a AttendanceType,
}
impl Event for AttendanceTypeUpserted<'_> {
    const NAME: &'static str = "attendance_type.upserted";
    fn topic_path(&self) -> String {
        topics::attendance_types()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTypeDeleted {
    pub attendance_type_id: i64,
}
impl Event for AttendanceTypeDeleted {
    const NAME: &'static str = "attendance_type.deleted";
    fn topic_path(&self) -> String {
        topics::attendance_types()
    }
}

#[derive(Debug, Serialize)]
pub struct SessionUpdated<'a> {
    #[serde(flatten)]
    pub session: &'a AttendanceSession,
}
impl Event for SessionUpdated<'_> {
    const NAME: &'static str = "attendance.session_updated";
    fn topic_path(&self) -> String {
        topics::attendance_session(self.session.id)
    }
}

/// Index-level notice so list views learn about opened and closed sessions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndexChanged {
    pub session_id: i64,
    pub attendance_type_id: i64,
    pub is_active: bool,
}
impl Event for SessionIndexChanged {
    const NAME: &'static str = "attendance.session_index_changed";
    fn topic_path(&self) -> String {
        topics::attendance_sessions()
    }
}

#[derive(Debug, Serialize)]
pub struct IzinUpdated<'a> {
    #[serde(flatten)]
    pub izin: &'a LeaveApplication,
}
impl Event for IzinUpdated<'_> {
    const NAME: &'static str = "izin.updated";
    fn topic_path(&self) -> String {
        topics::izin_for_santri(self.izin.izin.santri_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IzinDeleted {
    pub izin_id: i64,
    pub santri_id: i64,
}
impl Event for IzinDeleted {
    const NAME: &'static str = "izin.deleted";
    fn topic_path(&self) -> String {
        topics::izin_for_santri(self.santri_id)
    }
}

#[derive(Debug, Serialize)]
pub struct SantriLeaveStatusUpdated<'a> {
    #[serde(skip)]
    pub kode_asrama: &'a str,
    #[serde(flatten)]
    pub status: &'a SantriLeaveStatus,
}
impl Event for SantriLeaveStatusUpdated<'_> {
    const NAME: &'static str = "santri.leave_status_updated";
    fn topic_path(&self) -> String {
        topics::santri_for_asrama(self.kode_asrama)
    }
}

/* ---------- one-liner helpers ---------- */

pub async fn attendance_type_upserted(feed: &FeedManager, attendance_type: &AttendanceType) {
    emit(feed, &AttendanceTypeUpserted { attendance_type }).await;
}

pub async fn attendance_type_deleted(feed: &FeedManager, attendance_type_id: i64) {
    emit(feed, &AttendanceTypeDeleted { attendance_type_id }).await;
}

pub async fn session_updated(feed: &FeedManager, session: &AttendanceSession) {
    emit(feed, &SessionUpdated { session }).await;
    emit(
        feed,
        &SessionIndexChanged {
            session_id: session.id,
            attendance_type_id: session.attendance_type_id,
            is_active: session.is_active,
        },
    )
    .await;
}

pub async fn izin_updated(feed: &FeedManager, izin: &LeaveApplication) {
    emit(feed, &IzinUpdated { izin }).await;
}

pub async fn izin_deleted(feed: &FeedManager, izin_id: i64, santri_id: i64) {
    emit(feed, &IzinDeleted { izin_id, santri_id }).await;
}

pub async fn santri_leave_status_updated(
    feed: &FeedManager,
    kode_asrama: &str,
    status: &SantriLeaveStatus,
) {
    emit(feed, &SantriLeaveStatusUpdated { kode_asrama, status }).await;
}
