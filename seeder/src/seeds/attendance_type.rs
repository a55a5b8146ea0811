use super::asrama_codes;
use crate::seed::Seeder;
use services::AppError;
use services::attendance_type::{AttendanceTypeService, CreateAttendanceType};
use services::santri::SantriService;
use util::state::AppState;

pub struct AttendanceTypeSeeder;

#[async_trait::async_trait]
impl Seeder for AttendanceTypeSeeder {
    async fn seed(&self, state: &AppState) -> Result<(), AppError> {
        let svc = AttendanceTypeService::new(state.clone());

        for (name, description) in [
            ("Subuh", "Sholat subuh berjamaah"),
            ("Maghrib", "Sholat maghrib berjamaah"),
        ] {
            svc.create_type(CreateAttendanceType {
                description: Some(description.to_string()),
                is_frequent: true,
                ..CreateAttendanceType::new(name)
            })
            .await?;
        }

        // Tahfidz class: the first five santri of the default asrama only.
        let [default_asrama, _] = asrama_codes();
        let scope: Vec<i64> = SantriService::new(state.clone())
            .list_by_asrama(&default_asrama, None)
            .await?
            .into_iter()
            .take(5)
            .map(|s| s.id)
            .collect();

        svc.create_type(CreateAttendanceType {
            description: Some("Setoran hafalan".to_string()),
            is_frequent: false,
            scope: (!scope.is_empty()).then_some(scope),
            ..CreateAttendanceType::new("Tahfidz")
        })
        .await?;

        Ok(())
    }
}
