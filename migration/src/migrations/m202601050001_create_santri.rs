use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601050001_create_santri"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("SantriCollection"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("nama")).string().not_null())
                    .col(ColumnDef::new(Alias::new("kode_asrama")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("status_aktif"))
                            .enumeration(
                                Alias::new("status_aktif"),
                                vec![
                                    Alias::new("aktif"),
                                    Alias::new("non_aktif"),
                                    Alias::new("alumni"),
                                ],
                            )
                            .not_null()
                            .default("aktif"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status_kehadiran"))
                            .enumeration(
                                Alias::new("status_kehadiran"),
                                vec![Alias::new("Ada"), Alias::new("Sakit"), Alias::new("Pulang")],
                            )
                            .not_null()
                            .default("Ada"),
                    )
                    // statusKepulangan, flattened; all null when the santri never left
                    .col(ColumnDef::new(Alias::new("kepulangan_alasan")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("kepulangan_pemberi_izin"))
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("kepulangan_rencana_kembali"))
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("kepulangan_sudah_kembali"))
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("kepulangan_tgl_pulang"))
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("kepulangan_overridden_by"))
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_santri_kode_asrama_kehadiran")
                    .if_not_exists()
                    .table(Alias::new("SantriCollection"))
                    .col(Alias::new("kode_asrama"))
                    .col(Alias::new("status_kehadiran"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("SantriCollection")).to_owned())
            .await
    }
}
