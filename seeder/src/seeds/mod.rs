pub mod attendance_session;
pub mod attendance_type;
pub mod izin;
pub mod santri;

/// The configured default dormitory plus a second one.
pub fn asrama_codes() -> [String; 2] {
    [util::config::default_kode_asrama(), "B2".to_string()]
}
