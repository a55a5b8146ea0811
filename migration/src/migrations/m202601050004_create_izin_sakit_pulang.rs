use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601050004_create_izin_sakit_pulang"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("IzinSakitPulang"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("santri_id"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_by"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("reason")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("izin_type"))
                            .enumeration(
                                Alias::new("izin_type"),
                                vec![Alias::new("sick"), Alias::new("pulang")],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .enumeration(
                                Alias::new("izin_status"),
                                vec![
                                    Alias::new("PendingUstadzahReview"),
                                    Alias::new("PendingUstadzahApproval"),
                                    Alias::new("Approved"),
                                    Alias::new("Returned"),
                                    Alias::new("Rejected"),
                                ],
                            )
                            .not_null()
                            .default("PendingUstadzahReview"),
                    )
                    .col(ColumnDef::new(Alias::new("leave_date")).timestamp().not_null())
                    .col(
                        ColumnDef::new(Alias::new("requested_return_date"))
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("actual_return_date"))
                            .timestamp()
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
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_izin_santri")
                            .from(Alias::new("IzinSakitPulang"), Alias::new("santri_id"))
                            .to(Alias::new("SantriCollection"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_izin_santri_id")
                    .if_not_exists()
                    .table(Alias::new("IzinSakitPulang"))
                    .col(Alias::new("santri_id"))
                    .to_owned(),
            )
            .await?;

        // approvals, ordered by id
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("IzinSakitPulangApprovals"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("izin_id")).big_integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("role"))
                            .enumeration(
                                Alias::new("actor_role"),
                                vec![
                                    Alias::new("santri"),
                                    Alias::new("waliSantri"),
                                    Alias::new("pengurus"),
                                    Alias::new("ustadzah"),
                                    Alias::new("admin"),
                                ],
                            )
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("approver_id"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("decision"))
                            .enumeration(
                                Alias::new("approval_decision"),
                                vec![Alias::new("approved"), Alias::new("rejected")],
                            )
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("timestamp")).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_izin_approval_izin")
                            .from(Alias::new("IzinSakitPulangApprovals"), Alias::new("izin_id"))
                            .to(Alias::new("IzinSakitPulang"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("IzinSakitPulangApprovals"))
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("IzinSakitPulang")).to_owned())
            .await
    }
}
