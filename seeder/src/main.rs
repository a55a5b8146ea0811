use crate::seed::{Seeder, run_seeder};
use crate::seeds::{
    attendance_session::AttendanceSessionSeeder, attendance_type::AttendanceTypeSeeder,
    izin::IzinSeeder, santri::SantriSeeder,
};
use colored::*;
use migration::{Migrator, MigratorTrait};
use util::config;
use util::feed::FeedManager;
use util::state::AppState;

mod seed;
mod seeds;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guard = common::logger::init_logging(
        "logs",
        &config::log_file(),
        &config::log_level(),
        config::log_to_stdout(),
    );

    let db = match db::connect().await {
        Ok(db) => db,
        Err(err) => {
            eprintln!("{} {err}", "Failed to connect to database:".red());
            std::process::exit(1);
        }
    };

    if let Err(err) = Migrator::up(&db, None).await {
        eprintln!("{} {err}", "Failed to run migrations:".red());
        std::process::exit(1);
    }

    let state = AppState::new(db, FeedManager::new());
    tracing::info!(database = %config::database_path(), "Seeding database");

    for (seeder, name) in [
        (Box::new(SantriSeeder) as Box<dyn Seeder + Send + Sync>, "Santri"),
        (Box::new(AttendanceTypeSeeder), "AttendanceType"),
        (Box::new(AttendanceSessionSeeder), "AttendanceSession"),
        (Box::new(IzinSeeder), "IzinSakitPulang"),
    ] {
        run_seeder(&*seeder, name, &state).await;
    }
}
