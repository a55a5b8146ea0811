//! Attendance and leave tracking for the asrama.
//!
//! Every service is a thin struct over [`util::state::AppState`]; entity
//! access goes through the `db` models, which are generic over
//! `sea_orm::ConnectionTrait` so multi-document writes can share one
//! transaction.

pub mod actor;
pub mod attendance_session;
pub mod attendance_type;
pub mod error;
pub mod events;
pub mod izin;
pub mod overdue;
pub mod report;
pub mod santri;

pub use actor::Actor;
pub use error::AppError;
