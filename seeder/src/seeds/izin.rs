use super::asrama_codes;
use crate::seed::Seeder;
use chrono::{Duration, Utc};
use db::models::izin_approval::Decision;
use db::models::izin_sakit_pulang::IzinType;
use services::izin::{CreateIzin, IzinService};
use services::santri::SantriService;
use services::actor::Role;
use services::{Actor, AppError};
use util::state::AppState;

const WALI_ID: i64 = 100;
const PENGURUS: Actor = Actor {
    id: 1,
    role: Role::Pengurus,
};
const USTADZAH: Actor = Actor {
    id: 2,
    role: Role::Ustadzah,
};

pub struct IzinSeeder;

/// How far an application gets through the workflow.
#[derive(Clone, Copy)]
enum Outcome {
    Pending,
    Reviewed,
    Approved,
    Overdue,
    Returned,
    Rejected,
}

#[async_trait::async_trait]
impl Seeder for IzinSeeder {
    async fn seed(&self, state: &AppState) -> Result<(), AppError> {
        let svc = IzinService::new(state.clone());
        let [default_asrama, _] = asrama_codes();
        let santri = SantriService::new(state.clone())
            .list_by_asrama(&default_asrama, None)
            .await?;

        let outcomes = [
            (Outcome::Pending, IzinType::Sick, "Demam sejak semalam"),
            (Outcome::Reviewed, IzinType::Pulang, "Acara keluarga"),
            (Outcome::Approved, IzinType::Pulang, "Walimah kakak"),
            (Outcome::Overdue, IzinType::Pulang, "Menjenguk nenek"),
            (Outcome::Returned, IzinType::Sick, "Kontrol ke dokter"),
            (Outcome::Rejected, IzinType::Pulang, "Liburan"),
        ];

        let now = Utc::now();
        for (s, (outcome, izin_type, reason)) in santri.iter().rev().zip(outcomes) {
            let (leave_date, requested_return_date) = match outcome {
                Outcome::Overdue => (now - Duration::days(6), now - Duration::days(2)),
                _ => (
                    now - Duration::days(fastrand::i64(0..2)),
                    now + Duration::days(fastrand::i64(1..5)),
                ),
            };

            let izin = svc
                .create_izin(
                    Actor::wali(WALI_ID),
                    CreateIzin {
                        santri_id: s.id,
                        reason: reason.to_string(),
                        izin_type,
                        leave_date,
                        requested_return_date,
                    },
                )
                .await?;
            let id = izin.id();

            match outcome {
                Outcome::Pending => {}
                Outcome::Rejected => {
                    svc.review(id, PENGURUS, Decision::Rejected).await?;
                }
                Outcome::Reviewed => {
                    svc.review(id, PENGURUS, Decision::Approved).await?;
                }
                Outcome::Approved | Outcome::Overdue | Outcome::Returned => {
                    svc.review(id, PENGURUS, Decision::Approved).await?;
                    svc.approve(id, USTADZAH, Decision::Approved).await?;
                    if matches!(outcome, Outcome::Returned) {
                        svc.mark_returned(id, now).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
