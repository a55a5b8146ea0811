use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use std::collections::{BTreeSet, HashMap};

/// One santri in the scope of an attendance type. A type with no rows here
/// applies to every santri.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "AttendanceTypeScopes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub attendance_type_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub santri_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_type::Entity",
        from = "Column::AttendanceTypeId",
        to = "super::attendance_type::Column::Id"
    )]
    AttendanceType,
}

impl Related<super::attendance_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn replace_for_type<C: ConnectionTrait>(
        db: &C,
        attendance_type_id: i64,
        santri_ids: &BTreeSet<i64>,
    ) -> Result<(), DbErr> {
        Entity::delete_many()
            .filter(Column::AttendanceTypeId.eq(attendance_type_id))
            .exec(db)
            .await?;

        if santri_ids.is_empty() {
            return Ok(());
        }

        let rows = santri_ids.iter().map(|santri_id| ActiveModel {
            attendance_type_id: sea_orm::ActiveValue::Set(attendance_type_id),
            santri_id: sea_orm::ActiveValue::Set(*santri_id),
        });
        Entity::insert_many(rows).exec_without_returning(db).await?;
        Ok(())
    }

    pub async fn ids_for_type<C: ConnectionTrait>(
        db: &C,
        attendance_type_id: i64,
    ) -> Result<BTreeSet<i64>, DbErr> {
        let rows = Entity::find()
            .filter(Column::AttendanceTypeId.eq(attendance_type_id))
            .order_by_asc(Column::SantriId)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|r| r.santri_id).collect())
    }

    /// Scope sets keyed by type id; unscoped types are absent from the map.
    pub async fn ids_for_types<C: ConnectionTrait>(
        db: &C,
        attendance_type_ids: &[i64],
    ) -> Result<HashMap<i64, BTreeSet<i64>>, DbErr> {
        if attendance_type_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Entity::find()
            .filter(Column::AttendanceTypeId.is_in(attendance_type_ids.iter().copied()))
            .all(db)
            .await?;

        let mut scopes: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        for row in rows {
            scopes
                .entry(row.attendance_type_id)
                .or_default()
                .insert(row.santri_id);
        }
        Ok(scopes)
    }
}
