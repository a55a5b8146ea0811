pub mod m202601050001_create_santri;
pub mod m202601050002_create_attendance_types;
pub mod m202601050003_create_attendance_sessions;
pub mod m202601050004_create_izin_sakit_pulang;
