use super::asrama_codes;
use crate::seed::Seeder;
use chrono::{Duration, Utc};
use db::models::attendance_session_status::StudentStatus;
use db::models::{attendance_session, attendance_session_status, santri};
use services::AppError;
use services::attendance_type::AttendanceTypeService;
use util::state::AppState;

const DAYS: i64 = 7;
const PENGURUS_ID: i64 = 1;

pub struct AttendanceSessionSeeder;

/// Mostly present, some absences, the odd excuse.
fn random_status() -> StudentStatus {
    match fastrand::u8(0..100) {
        0..=69 => StudentStatus::Present,
        70..=81 => StudentStatus::Absent,
        82..=87 => StudentStatus::ExcusedSick,
        88..=92 => StudentStatus::ExcusedPulang,
        93..=96 => StudentStatus::Dispen,
        _ => StudentStatus::OverridePresent,
    }
}

#[async_trait::async_trait]
impl Seeder for AttendanceSessionSeeder {
    async fn seed(&self, state: &AppState) -> Result<(), AppError> {
        let db = state.db();
        let frequent: Vec<_> = AttendanceTypeService::new(state.clone())
            .list_types()
            .await?
            .into_iter()
            .filter(|t| t.is_frequent)
            .collect();

        // Backdated sessions are written through the models directly; the
        // service always stamps sessions with the current time.
        let now = Utc::now();
        for kode_asrama in asrama_codes() {
            let roster = santri::Model::find_aktif_ids_by_asrama(db, &kode_asrama).await?;
            if roster.is_empty() {
                continue;
            }

            for attendance_type in &frequent {
                for day in (1..=DAYS).rev() {
                    let at = now - Duration::days(day);
                    let session =
                        attendance_session::Model::create(db, attendance_type.id, PENGURUS_ID, at)
                            .await?;
                    attendance_session_status::Model::insert_roster(
                        db,
                        session.id,
                        &roster,
                        PENGURUS_ID,
                        at,
                    )
                    .await?;

                    for santri_id in &roster {
                        let status = random_status();
                        if status != StudentStatus::Absent {
                            attendance_session_status::Model::set_status(
                                db,
                                session.id,
                                *santri_id,
                                status,
                                PENGURUS_ID,
                                at,
                            )
                            .await?;
                        }
                    }

                    attendance_session::Model::close(
                        db,
                        session.id,
                        PENGURUS_ID,
                        at + Duration::minutes(30),
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }
}
