pub mod attendance_session;
pub mod attendance_session_status;
pub mod attendance_type;
pub mod attendance_type_scope;
pub mod izin_approval;
pub mod izin_sakit_pulang;
pub mod santri;

pub use attendance_session::Entity as AttendanceSession;
pub use attendance_session_status::Entity as AttendanceSessionStatus;
pub use attendance_type::Entity as AttendanceType;
pub use attendance_type_scope::Entity as AttendanceTypeScope;
pub use izin_approval::Entity as IzinApproval;
pub use izin_sakit_pulang::Entity as IzinSakitPulang;
pub use santri::Entity as Santri;
