use super::asrama_codes;
use crate::seed::Seeder;
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use services::AppError;
use services::santri::{CreateSantri, SantriService};
use util::state::AppState;

pub struct SantriSeeder;

#[async_trait::async_trait]
impl Seeder for SantriSeeder {
    async fn seed(&self, state: &AppState) -> Result<(), AppError> {
        let svc = SantriService::new(state.clone());

        for kode_asrama in asrama_codes() {
            for _ in 0..12 {
                let first: String = FirstName().fake();
                let last: String = LastName().fake();
                svc.create_santri(CreateSantri {
                    nama: format!("{first} {last}"),
                    kode_asrama: kode_asrama.clone(),
                })
                .await?;
            }
        }

        Ok(())
    }
}
