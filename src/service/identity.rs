use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    entities::accounts,
    repo::accounts::{AccountsRepo, IdentityField},
    service::{password, ServiceError},
};

/// What a free-text identifier turned out to be. Usernames are deliberately
/// not representable here: the reset flow only accepts email- or phone-shaped
/// input, which keeps username guessing out of that surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
}

impl IdentifierKind {
    pub fn field(self) -> IdentityField {
        match self {
            IdentifierKind::Email => IdentityField::Email,
            IdentifierKind::Phone => IdentityField::Phone,
        }
    }
}

/// Shape-classify a raw identifier. Email: contains `@` and the part after
/// the last `@` contains a dot. Phone: all ASCII digits, 11 to 13 of them.
/// Anything else is rejected.
pub fn classify_identifier(raw: &str) -> Result<(IdentifierKind, &str), ServiceError> {
    let value = raw.trim();

    if value.contains('@') {
        let domain = value.rsplit('@').next().unwrap_or("");
        if domain.contains('.') {
            return Ok((IdentifierKind::Email, value));
        }
    } else if (11..=13).contains(&value.len()) && value.chars().all(|ch| ch.is_ascii_digit()) {
        return Ok((IdentifierKind::Phone, value));
    }

    Err(ServiceError::validation(
        "identifier",
        "identifier must be an email address or a phone number",
    ))
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Resolve a login identifier against email, then username, then phone,
    /// and verify the password. Any failure is the same opaque `AuthFailure`.
    async fn resolve_login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<accounts::Model, ServiceError>;
}

pub struct IdentityServiceImpl {
    accounts_repo: Arc<dyn AccountsRepo>,
}

impl IdentityServiceImpl {
    pub fn new(accounts_repo: Arc<dyn AccountsRepo>) -> Self {
        Self { accounts_repo }
    }
}

#[async_trait]
impl IdentityService for IdentityServiceImpl {
    async fn resolve_login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<accounts::Model, ServiceError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(ServiceError::AuthFailure);
        }

        let mut account = None;
        for field in IdentityField::LOGIN_ORDER {
            if let Some(found) = self
                .accounts_repo
                .find_by_field(field, identifier)
                .await
                .map_err(ServiceError::internal)?
            {
                account = Some(found);
                break;
            }
        }

        let Some(account) = account else {
            return Err(ServiceError::AuthFailure);
        };

        if !password::verify(&account.password_hash, password) {
            return Err(ServiceError::AuthFailure);
        }

        Ok(account)
    }
}
