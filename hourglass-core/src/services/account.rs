use crate::{
    Account, AccountId, Error,
    crypto::hash_password,
    error::{AuthError, StorageError},
    repositories::AccountRepository,
    storage::NewAccount,
    validation::{normalize_email, validate_email, validate_name, validate_password},
};
use std::sync::Arc;

/// Service for account registration and lookup
pub struct AccountService<R: AccountRepository> {
    repository: Arc<R>,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Register a new account with a local password.
    ///
    /// Fails with [`AuthError::AccountAlreadyExists`] if the (normalized)
    /// email is taken, including by a federated-only account.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Account, Error> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;
        validate_name(name.as_deref())?;

        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(Error::Auth(AuthError::AccountAlreadyExists));
        }

        let new_account = NewAccount::builder()
            .email(email)
            .name(name)
            .password_hash(hash_password(password))
            .build()?;

        match self.repository.create(new_account).await {
            Ok(account) => {
                tracing::info!(account_id = %account.id, "Account registered");
                Ok(account)
            }
            // Lost a race with a concurrent registration for the same email
            Err(Error::Storage(StorageError::Constraint(_))) => {
                Err(Error::Auth(AuthError::AccountAlreadyExists))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.repository.find_by_id(id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.repository.find_by_email(&normalize_email(email)).await
    }

    /// Set or replace the local password of an existing account.
    ///
    /// This is how a federated-only account gains a password; its identity
    /// (id and email) stays the same.
    pub async fn set_password(&self, id: &AccountId, password: &str) -> Result<(), Error> {
        validate_password(password)?;

        if self.repository.find_by_id(id).await?.is_none() {
            return Err(Error::Storage(StorageError::NotFound));
        }

        self.repository
            .set_password_hash(id, &hash_password(password))
            .await?;

        tracing::info!(account_id = %id, "Password updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::verify_password, services::testing::MockStore};

    #[tokio::test]
    async fn test_register_normalizes_email_and_hashes_password() {
        let store = MockStore::new();
        let service = AccountService::new(store.clone());

        let account = service
            .register("  Ada@Example.COM ", "analytical-engine", Some("Ada".to_string()))
            .await
            .unwrap();

        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.name.as_deref(), Some("Ada"));
        let hash = account.password_hash.as_deref().unwrap();
        assert!(verify_password("analytical-engine", hash));
        assert_ne!(hash, "analytical-engine");

        let found = service
            .get_account_by_email("ADA@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, account.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MockStore::new();
        let service = AccountService::new(store);

        service
            .register("dup@example.com", "password-one", None)
            .await
            .unwrap();
        let err = service
            .register("Dup@example.com", "password-two", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::AccountAlreadyExists)));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let service = AccountService::new(MockStore::new());

        assert!(
            service
                .register("not-an-email", "long-enough", None)
                .await
                .unwrap_err()
                .is_validation_error()
        );
        assert!(
            service
                .register("a@example.com", "short", None)
                .await
                .unwrap_err()
                .is_validation_error()
        );
    }

    #[tokio::test]
    async fn test_set_password_for_federated_account() {
        let store = MockStore::new();
        let service = AccountService::new(store.clone());

        let account = AccountRepository::upsert_by_email(
            store.as_ref(),
            NewAccount::new("fed@example.com".to_string()),
        )
        .await
        .unwrap();
        assert!(!account.has_password());

        service
            .set_password(&account.id, "now-with-password")
            .await
            .unwrap();

        let updated = store.account(&account.id).await;
        assert_eq!(updated.id, account.id);
        assert!(verify_password(
            "now-with-password",
            updated.password_hash.as_deref().unwrap()
        ));
    }

    #[tokio::test]
    async fn test_set_password_unknown_account() {
        let service = AccountService::new(MockStore::new());
        let err = service
            .set_password(&AccountId::new_random(), "whatever-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::NotFound)));
    }
}
