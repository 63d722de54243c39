use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use std::sync::Arc;

use crate::{
    entities::accounts,
    repo::{
        accounts::{AccountsRepo, IdentityField},
        username_changes::UsernameChangesRepo,
    },
    service::{
        identity::classify_identifier,
        otp::OtpService,
        password::{self, MIN_PASSWORD_LEN},
        ServiceError,
    },
};

pub struct RegisterInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

/// Sparse profile patch. `None` leaves a field unchanged; a provided empty
/// string clears it (original behavior, which also means the last identity
/// field can be cleared this way).
#[derive(Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[async_trait]
pub trait CredentialsService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<accounts::Model, ServiceError>;
    async fn request_reset(&self, identifier: &str) -> Result<(), ServiceError>;
    async fn confirm_reset(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> Result<accounts::Model, ServiceError>;
    async fn change_password(
        &self,
        account: accounts::Model,
        old_password: &str,
        new_password: &str,
    ) -> Result<accounts::Model, ServiceError>;
    async fn change_username(
        &self,
        account: accounts::Model,
        new_username: &str,
    ) -> Result<accounts::Model, ServiceError>;
    async fn update_profile(
        &self,
        account: accounts::Model,
        update: ProfileUpdate,
    ) -> Result<accounts::Model, ServiceError>;
}

pub struct CredentialsServiceImpl {
    accounts_repo: Arc<dyn AccountsRepo>,
    username_changes_repo: Arc<dyn UsernameChangesRepo>,
    otp: Arc<dyn OtpService>,
}

/// Unique index names from the schema, mapped to the conflicting field.
/// Registration relies on the store's constraint rejection instead of a
/// pre-check, so two racing inserts cannot both win.
const UNIQUE_INDEXES: [(&str, &str); 3] = [
    ("accounts_email_unique", "email"),
    ("accounts_username_unique", "username"),
    ("accounts_phone_unique", "phone"),
];

fn conflict_field(err: &sea_orm::DbErr) -> Option<&'static str> {
    let message = err.to_string();
    UNIQUE_INDEXES
        .iter()
        .find(|(index, _)| message.contains(index))
        .map(|(_, field)| *field)
}

fn none_if_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl CredentialsServiceImpl {
    pub fn new(
        accounts_repo: Arc<dyn AccountsRepo>,
        username_changes_repo: Arc<dyn UsernameChangesRepo>,
        otp: Arc<dyn OtpService>,
    ) -> Self {
        Self {
            accounts_repo,
            username_changes_repo,
            otp,
        }
    }

    async fn account_for_identifier(
        &self,
        identifier: &str,
    ) -> Result<accounts::Model, ServiceError> {
        let (kind, value) = classify_identifier(identifier)?;
        let account = self.accounts_repo.find_by_field(kind.field(), value).await?;
        account.ok_or(ServiceError::NotFound)
    }

    async fn store_new_password(
        &self,
        account: accounts::Model,
        new_password: &str,
    ) -> Result<accounts::Model, ServiceError> {
        let hash = password::hash(new_password)?;
        let mut active: accounts::ActiveModel = account.into();
        active.password_hash = Set(hash);
        active.updated_at = Set(Utc::now().into());
        Ok(self.accounts_repo.update(active).await?)
    }
}

#[async_trait]
impl CredentialsService for CredentialsServiceImpl {
    async fn register(&self, input: RegisterInput) -> Result<accounts::Model, ServiceError> {
        let email = input.email.and_then(none_if_empty).map(|v| v.to_lowercase());
        let username = input.username.and_then(none_if_empty);
        let phone = input.phone.and_then(none_if_empty);

        if email.is_none() && username.is_none() && phone.is_none() {
            return Err(ServiceError::validation(
                "identity",
                "at least one of email, username, phone required",
            ));
        }

        let password_hash = password::hash(&input.password)?;
        let model = accounts::ActiveModel {
            uid: Set(uuid::Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            phone: Set(phone),
            password_hash: Set(password_hash),
            ..Default::default()
        };

        self.accounts_repo.insert(model).await.map_err(|err| {
            match conflict_field(&err) {
                Some(field) => {
                    ServiceError::validation(field, format!("{} already registered", field))
                }
                None => ServiceError::internal(err),
            }
        })
    }

    async fn request_reset(&self, identifier: &str) -> Result<(), ServiceError> {
        let account = self.account_for_identifier(identifier).await?;
        self.otp.issue(&account).await
    }

    async fn confirm_reset(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> Result<accounts::Model, ServiceError> {
        if !self.otp.verify(code) {
            return Err(ServiceError::validation("code", "invalid code"));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation("new_password", "password too short"));
        }

        let account = self.account_for_identifier(identifier).await?;
        self.store_new_password(account, new_password).await
    }

    async fn change_password(
        &self,
        account: accounts::Model,
        old_password: &str,
        new_password: &str,
    ) -> Result<accounts::Model, ServiceError> {
        if !password::verify(&account.password_hash, old_password) {
            return Err(ServiceError::validation(
                "old_password",
                "old password incorrect",
            ));
        }
        if new_password == old_password {
            return Err(ServiceError::validation(
                "new_password",
                "new password must differ from the old one",
            ));
        }
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation("new_password", "password too short"));
        }

        self.store_new_password(account, new_password).await
    }

    async fn change_username(
        &self,
        account: accounts::Model,
        new_username: &str,
    ) -> Result<accounts::Model, ServiceError> {
        let new_username = new_username.trim();
        if new_username.is_empty() {
            return Err(ServiceError::validation("username", "username required"));
        }

        let taken = self
            .accounts_repo
            .find_conflict(IdentityField::Username, new_username, Some(account.id))
            .await?;
        if taken.is_some() {
            return Err(ServiceError::validation("username", "username already taken"));
        }

        let (updated, _record) = self
            .username_changes_repo
            .apply_change(account, new_username.to_string())
            .await?;
        Ok(updated)
    }

    async fn update_profile(
        &self,
        account: accounts::Model,
        update: ProfileUpdate,
    ) -> Result<accounts::Model, ServiceError> {
        // Validate every provided identity field before applying anything.
        let checks = [
            (IdentityField::Username, update.username.as_deref()),
            (IdentityField::Email, update.email.as_deref()),
            (IdentityField::Phone, update.phone.as_deref()),
        ];
        for (field, value) in checks {
            let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            let taken = self
                .accounts_repo
                .find_conflict(field, value, Some(account.id))
                .await?;
            if taken.is_some() {
                return Err(ServiceError::validation(
                    field.name(),
                    format!("{} already taken", field.name()),
                ));
            }
        }

        let mut active: accounts::ActiveModel = account.into();
        if let Some(first_name) = update.first_name {
            active.first_name = Set(none_if_empty(first_name));
        }
        if let Some(last_name) = update.last_name {
            active.last_name = Set(none_if_empty(last_name));
        }
        if let Some(username) = update.username {
            active.username = Set(none_if_empty(username));
        }
        if let Some(email) = update.email {
            active.email = Set(none_if_empty(email).map(|v| v.to_lowercase()));
        }
        if let Some(phone) = update.phone {
            active.phone = Set(none_if_empty(phone));
        }
        active.updated_at = Set(Utc::now().into());

        self.accounts_repo.update(active).await.map_err(|err| {
            // A concurrent writer can still win the race between the probe
            // and the write; the constraint rejection names the loser's field.
            match conflict_field(&err) {
                Some(field) => ServiceError::validation(field, format!("{} already taken", field)),
                None => ServiceError::internal(err),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::{
        account_model, MemoryAccountsRepo, MemoryUsernameChangesRepo,
    };
    use crate::service::otp::FixedCodeOtpService;

    const RESET_CODE: &str = "123456";

    fn service(
        accounts: Arc<MemoryAccountsRepo>,
    ) -> (CredentialsServiceImpl, Arc<MemoryUsernameChangesRepo>) {
        let changes = MemoryUsernameChangesRepo::new(accounts.clone());
        (
            CredentialsServiceImpl::new(accounts, changes.clone(), Arc::new(FixedCodeOtpService)),
            changes,
        )
    }

    fn register_input(
        email: Option<&str>,
        username: Option<&str>,
        phone: Option<&str>,
    ) -> RegisterInput {
        RegisterInput {
            email: email.map(str::to_string),
            username: username.map(str::to_string),
            phone: phone.map(str::to_string),
            password: "initial-pw".to_string(),
        }
    }

    #[tokio::test]
    async fn register_requires_an_identity_field() {
        let (service, _) = service(MemoryAccountsRepo::new());
        let err = service
            .register(register_input(None, None, None))
            .await
            .expect_err("no identity");
        assert!(matches!(err, ServiceError::Validation { field: "identity", .. }));

        // Whitespace-only values count as absent.
        let err = service
            .register(register_input(Some("  "), Some(""), None))
            .await
            .expect_err("blank identity");
        assert!(matches!(err, ServiceError::Validation { field: "identity", .. }));
    }

    #[tokio::test]
    async fn register_with_only_username_succeeds_and_hashes() {
        let (service, _) = service(MemoryAccountsRepo::new());
        let account = service
            .register(register_input(None, Some("solo"), None))
            .await
            .expect("register");
        assert_eq!(account.username.as_deref(), Some("solo"));
        assert_ne!(account.password_hash, "initial-pw");
        assert!(password::verify(&account.password_hash, "initial-pw"));
    }

    #[tokio::test]
    async fn register_normalizes_email() {
        let (service, _) = service(MemoryAccountsRepo::new());
        let account = service
            .register(register_input(Some(" Amir@Example.COM "), None, None))
            .await
            .expect("register");
        assert_eq!(account.email.as_deref(), Some("amir@example.com"));
    }

    #[tokio::test]
    async fn register_conflict_names_the_field() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), None, None, "pw"));
        let (service, _) = service(accounts);

        let err = service
            .register(register_input(Some("AMIR@example.com"), Some("other"), None))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, ServiceError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn request_reset_rejects_username_shapes_and_unknown_accounts() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), Some("amir"), None, "pw"));
        let (service, _) = service(accounts);

        service
            .request_reset("amir@example.com")
            .await
            .expect("known email");

        let err = service.request_reset("amir").await.expect_err("username shape");
        assert!(matches!(err, ServiceError::Validation { field: "identifier", .. }));

        let err = service
            .request_reset("nobody@example.com")
            .await
            .expect_err("unknown email");
        assert_eq!(err, ServiceError::NotFound);
    }

    #[tokio::test]
    async fn confirm_reset_replaces_the_password() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(
            1,
            None,
            None,
            Some("09123456789"),
            "old-password",
        ));
        let (service, _) = service(accounts.clone());

        let updated = service
            .confirm_reset("09123456789", RESET_CODE, "new-password")
            .await
            .expect("reset");
        assert!(password::verify(&updated.password_hash, "new-password"));
        assert!(!password::verify(&updated.password_hash, "old-password"));
        assert!(password::verify(
            &accounts.get(1).password_hash,
            "new-password"
        ));
    }

    #[tokio::test]
    async fn confirm_reset_rejects_a_wrong_code_before_touching_anything() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), None, None, "old-password"));
        let (service, _) = service(accounts.clone());

        let err = service
            .confirm_reset("amir@example.com", "000000", "new-password")
            .await
            .expect_err("wrong code");
        assert!(matches!(err, ServiceError::Validation { field: "code", .. }));
        assert!(password::verify(&accounts.get(1).password_hash, "old-password"));
    }

    #[tokio::test]
    async fn confirm_reset_enforces_minimum_length() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), None, None, "old-password"));
        let (service, _) = service(accounts);

        let err = service
            .confirm_reset("amir@example.com", RESET_CODE, "short")
            .await
            .expect_err("5 chars");
        assert!(matches!(err, ServiceError::Validation { field: "new_password", .. }));
    }

    #[tokio::test]
    async fn confirm_reset_unknown_identifier_is_not_found() {
        let (service, _) = service(MemoryAccountsRepo::new());
        let err = service
            .confirm_reset("nobody@example.com", RESET_CODE, "new-password")
            .await
            .expect_err("unknown");
        assert_eq!(err, ServiceError::NotFound);
    }

    #[tokio::test]
    async fn change_password_validates_in_order() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), None, None, "old-password"));
        let (service, _) = service(accounts.clone());

        let err = service
            .change_password(accounts.get(1), "wrong", "new-password")
            .await
            .expect_err("old mismatch");
        assert!(matches!(err, ServiceError::Validation { field: "old_password", .. }));

        let err = service
            .change_password(accounts.get(1), "old-password", "old-password")
            .await
            .expect_err("unchanged");
        assert!(matches!(err, ServiceError::Validation { field: "new_password", .. }));

        let err = service
            .change_password(accounts.get(1), "old-password", "tiny")
            .await
            .expect_err("too short");
        assert!(matches!(err, ServiceError::Validation { field: "new_password", .. }));

        let updated = service
            .change_password(accounts.get(1), "old-password", "new-password")
            .await
            .expect("change");
        assert!(password::verify(&updated.password_hash, "new-password"));
        assert!(!password::verify(&updated.password_hash, "old-password"));
    }

    #[tokio::test]
    async fn change_username_appends_exactly_one_audit_row() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, None, Some("before"), None, "pw"));
        let (service, changes) = service(accounts.clone());

        let updated = service
            .change_username(accounts.get(1), "after")
            .await
            .expect("rename");
        assert_eq!(updated.username.as_deref(), Some("after"));
        assert_eq!(accounts.get(1).username.as_deref(), Some("after"));

        let records = changes.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].old_username.as_deref(), Some("before"));
        assert_eq!(records[0].new_username, "after");
        assert_eq!(records[0].account_id, 1);
    }

    #[tokio::test]
    async fn change_username_conflicts_with_other_accounts_only() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, None, Some("mine"), None, "pw"));
        accounts.seed(account_model(2, None, Some("theirs"), None, "pw"));
        let (service, changes) = service(accounts.clone());

        let err = service
            .change_username(accounts.get(1), "Theirs")
            .await
            .expect_err("case-insensitive conflict");
        assert!(matches!(err, ServiceError::Validation { field: "username", .. }));
        assert!(changes.records().is_empty());

        // Re-saving the current username is not a conflict.
        service
            .change_username(accounts.get(1), "mine")
            .await
            .expect("self rename");
        assert_eq!(changes.records().len(), 1);
    }

    #[tokio::test]
    async fn update_profile_is_partial() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), Some("amir"), None, "pw"));
        let (service, _) = service(accounts.clone());

        let updated = service
            .update_profile(
                accounts.get(1),
                ProfileUpdate {
                    first_name: Some("Amir".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("patch");
        assert_eq!(updated.first_name.as_deref(), Some("Amir"));
        assert_eq!(updated.email.as_deref(), Some("amir@example.com"));
        assert_eq!(updated.username.as_deref(), Some("amir"));
    }

    #[tokio::test]
    async fn update_profile_conflict_names_the_field_and_applies_nothing() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), Some("amir"), None, "pw"));
        accounts.seed(account_model(2, None, Some("taken"), None, "pw"));
        let (service, _) = service(accounts.clone());

        let err = service
            .update_profile(
                accounts.get(1),
                ProfileUpdate {
                    first_name: Some("Amir".to_string()),
                    username: Some("taken".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("conflict");
        assert!(matches!(err, ServiceError::Validation { field: "username", .. }));

        // All-or-nothing: the valid first_name patch was not applied either.
        let unchanged = accounts.get(1);
        assert_eq!(unchanged.first_name, None);
        assert_eq!(unchanged.username.as_deref(), Some("amir"));
    }

    #[tokio::test]
    async fn update_profile_allows_re_saving_own_values() {
        let accounts = MemoryAccountsRepo::new();
        accounts.seed(account_model(1, Some("amir@example.com"), Some("amir"), None, "pw"));
        let (service, _) = service(accounts.clone());

        let updated = service
            .update_profile(
                accounts.get(1),
                ProfileUpdate {
                    username: Some("amir".to_string()),
                    email: Some("Amir@Example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("own values are not conflicts");
        assert_eq!(updated.username.as_deref(), Some("amir"));
        assert_eq!(updated.email.as_deref(), Some("amir@example.com"));
    }
}
