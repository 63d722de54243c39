use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use sea_orm_migration::prelude::*;

pub async fn apply(
    manager: &SchemaManager<'_>,
    conn: &DatabaseConnection,
) -> Result<(), DbErr> {
    if !manager.has_table("accounts").await? {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Uid)
                            .uuid()
                            .not_null()
                            .default(SimpleExpr::Custom("gen_random_uuid()".into())),
                    )
                    .col(ColumnDef::new(Accounts::Username).string())
                    .col(ColumnDef::new(Accounts::Email).string())
                    .col(ColumnDef::new(Accounts::Phone).string())
                    .col(
                        ColumnDef::new(Accounts::PasswordHash)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::FirstName).string())
                    .col(ColumnDef::new(Accounts::LastName).string())
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Custom("now()".into())),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Custom("now()".into())),
                    )
                    .to_owned(),
            )
            .await?;

        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            "CREATE UNIQUE INDEX IF NOT EXISTS accounts_uid_unique \
             ON accounts (uid)"
                .to_string(),
        ))
        .await?;

        // The three login namespaces. Case-insensitive, and partial so that
        // absent values do not collide with each other.
        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            "CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_unique \
             ON accounts (lower(email)) WHERE email IS NOT NULL"
                .to_string(),
        ))
        .await?;

        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            "CREATE UNIQUE INDEX IF NOT EXISTS accounts_username_unique \
             ON accounts (lower(username)) WHERE username IS NOT NULL"
                .to_string(),
        ))
        .await?;

        conn.execute(Statement::from_string(
            DbBackend::Postgres,
            "CREATE UNIQUE INDEX IF NOT EXISTS accounts_phone_unique \
             ON accounts (lower(phone)) WHERE phone IS NOT NULL"
                .to_string(),
        ))
        .await?;
    }

    Ok(())
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Uid,
    Username,
    Email,
    Phone,
    PasswordHash,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
}
