//! Per-santri attendance statistics over closed sessions.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use db::models::attendance_session_status::{self, StudentStatus};
use db::models::{attendance_session, attendance_type, santri};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use util::state::AppState;

/// Which sessions and which santri a report covers. Empty means everything.
#[derive(Debug, Clone, Default)]
pub struct ReportScope {
    pub attendance_type_id: Option<i64>,
    pub santri_ids: Option<BTreeSet<i64>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub present_count: u32,
    pub absent_count: u32,
    pub excused_sick_count: u32,
    pub excused_pulang_count: u32,
    pub override_present_count: u32,
    pub dispen_count: u32,
}

impl StatusCounts {
    pub fn record(&mut self, status: StudentStatus) {
        let slot = match status {
            StudentStatus::Present => &mut self.present_count,
            StudentStatus::Absent => &mut self.absent_count,
            StudentStatus::ExcusedSick => &mut self.excused_sick_count,
            StudentStatus::ExcusedPulang => &mut self.excused_pulang_count,
            StudentStatus::OverridePresent => &mut self.override_present_count,
            StudentStatus::Dispen => &mut self.dispen_count,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.present_count
            + self.absent_count
            + self.excused_sick_count
            + self.excused_pulang_count
            + self.override_present_count
            + self.dispen_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendanceReport {
    pub santri_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nama: Option<String>,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub student_session_count: u32,
    pub attendance_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub session_count: usize,
    pub students: Vec<StudentAttendanceReport>,
}

/// `present / sessions` as a percentage with two decimals, e.g. `"66.67%"`.
/// `overridePresent` is tracked separately and does not count as present.
pub fn format_rate(present: u32, sessions: u32) -> String {
    let rate = if sessions == 0 {
        0.0
    } else {
        f64::from(present) / f64::from(sessions) * 100.0
    };
    format!("{rate:.2}%")
}

/// Folds status rows into per-santri counts, keyed and ordered by santri id.
pub fn tally<'a>(
    rows: impl IntoIterator<Item = &'a attendance_session_status::Model>,
    santri_ids: Option<&BTreeSet<i64>>,
) -> BTreeMap<i64, StatusCounts> {
    let mut counts: BTreeMap<i64, StatusCounts> = BTreeMap::new();
    for row in rows {
        if santri_ids.is_some_and(|ids| !ids.contains(&row.santri_id)) {
            continue;
        }
        counts.entry(row.santri_id).or_default().record(row.status);
    }
    counts
}

pub struct ReportService {
    state: AppState,
}

impl ReportService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Statistics over closed sessions with `start <= timestamp <= end`.
    /// Santri with no session in range are left out.
    pub async fn build_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        scope: ReportScope,
    ) -> Result<AttendanceReport, AppError> {
        if start > end {
            return Err(AppError::Validation(
                "Report start date must not be after its end date".into(),
            ));
        }

        let db = self.state.db();
        if let Some(type_id) = scope.attendance_type_id {
            if attendance_type::Model::find_by_id(db, type_id).await?.is_none() {
                return Err(AppError::not_found("AttendanceType", type_id));
            }
        }

        let type_filter = scope.attendance_type_id.map(|id| vec![id]);
        let session_ids: Vec<i64> =
            attendance_session::Model::find_closed(db, type_filter.as_deref(), start, end)
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect();

        let rows = attendance_session_status::Model::find_for_sessions(db, &session_ids).await?;
        let counts = tally(&rows, scope.santri_ids.as_ref());

        let ids: Vec<i64> = counts.keys().copied().collect();
        let names: BTreeMap<i64, String> = santri::Model::find_by_ids(db, &ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s.nama))
            .collect();

        let students: Vec<StudentAttendanceReport> = counts
            .into_iter()
            .map(|(santri_id, counts)| {
                let sessions = counts.total();
                StudentAttendanceReport {
                    santri_id,
                    nama: names.get(&santri_id).cloned(),
                    counts,
                    student_session_count: sessions,
                    attendance_rate: format_rate(counts.present_count, sessions),
                }
            })
            .collect();

        tracing::info!(
            sessions = session_ids.len(),
            students = students.len(),
            "Attendance report built"
        );

        Ok(AttendanceReport {
            start_date: start,
            end_date: end,
            session_count: session_ids.len(),
            students,
        })
    }
}
