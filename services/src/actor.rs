pub use db::models::izin_approval::Role;

/// Whoever is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn santri(id: i64) -> Self {
        Self::new(id, Role::Santri)
    }

    pub fn wali(id: i64) -> Self {
        Self::new(id, Role::WaliSantri)
    }

    pub fn pengurus(id: i64) -> Self {
        Self::new(id, Role::Pengurus)
    }

    pub fn ustadzah(id: i64) -> Self {
        Self::new(id, Role::Ustadzah)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }
}
