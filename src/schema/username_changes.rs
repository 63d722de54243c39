use sea_orm_migration::prelude::*;

pub async fn apply(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    if !manager.has_table("username_changes").await? {
        manager
            .create_table(
                Table::create()
                    .table(UsernameChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsernameChanges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsernameChanges::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsernameChanges::OldUsername).string())
                    .col(
                        ColumnDef::new(UsernameChanges::NewUsername)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsernameChanges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Custom("now()".into())),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_username_changes_account")
                            .from(UsernameChanges::Table, UsernameChanges::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("username_changes_account_idx")
                    .table(UsernameChanges::Table)
                    .col(UsernameChanges::AccountId)
                    .to_owned(),
            )
            .await?;
    }

    Ok(())
}

#[derive(Iden)]
enum UsernameChanges {
    Table,
    Id,
    AccountId,
    OldUsername,
    NewUsername,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
