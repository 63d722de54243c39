use sea_orm::{Database, DatabaseConnection, DbErr};
use std::env;

fn redact_db_url(url: &str) -> String {
    let mut result = String::with_capacity(url.len());
    let mut chars = url.chars().peekable();
    let mut in_authority = false;
    let mut redacting = false;

    while let Some(ch) = chars.next() {
        if !in_authority {
            result.push(ch);
            if ch == '/' && chars.peek() == Some(&'/') {
                // keep the second slash
                if let Some(next) = chars.next() {
                    result.push(next);
                }
                in_authority = true;
            }
            continue;
        }

        if redacting {
            if ch == '@' {
                redacting = false;
                result.push(ch);
            }
            continue;
        }

        if ch == ':' {
            if let Some(next) = chars.peek() {
                if *next != '/' {
                    result.push(ch);
                    result.push_str("***");
                    // consume until '@' handled by redacting state
                    redacting = true;
                    continue;
                }
            }
        }

        result.push(ch);

        if ch == '/' {
            // end of authority section
            break;
        }
    }

    for ch in chars {
        result.push(ch);
    }

    result
}

pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let url = env::var("DATABASE_URL")
        .map_err(|_| DbErr::Custom("DATABASE_URL is not set".to_string()))?;
    tracing::info!(url = %redact_db_url(&url), "connecting to database");
    Database::connect(url).await
}
