use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::AccountId,
    error::utilities::RequiredFieldExt,
    session::{ClientContext, SessionId},
};

/// Insert payload for a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub id: AccountId,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

impl NewAccount {
    pub fn builder() -> NewAccountBuilder {
        NewAccountBuilder::default()
    }

    /// An account with no local password, as created by federated login
    pub fn new(email: String) -> Self {
        Self {
            id: AccountId::new_random(),
            email,
            name: None,
            password_hash: None,
        }
    }
}

#[derive(Default)]
pub struct NewAccountBuilder {
    id: Option<AccountId>,
    email: Option<String>,
    name: Option<String>,
    password_hash: Option<String>,
}

impl NewAccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn password_hash(mut self, password_hash: String) -> Self {
        self.password_hash = Some(password_hash);
        self
    }

    pub fn build(self) -> Result<NewAccount, Error> {
        Ok(NewAccount {
            id: self.id.unwrap_or_default(),
            email: self.email.require_field("Email")?,
            name: self.name,
            password_hash: self.password_hash,
        })
    }
}

/// Insert payload for a new ledger entry
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: SessionId,
    pub token_hash: String,
    pub account_id: AccountId,
    pub client: ClientContext,
    pub login_time: DateTime<Utc>,
}

impl NewSession {
    pub fn new(
        account_id: AccountId,
        token_hash: String,
        client: ClientContext,
        login_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new_random(),
            token_hash,
            account_id,
            client,
            login_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_builder() {
        let account = NewAccount::builder()
            .email("a@example.com".to_string())
            .name(Some("Ada".to_string()))
            .password_hash("hash".to_string())
            .build()
            .unwrap();

        assert!(account.id.is_valid());
        assert_eq!(account.name.as_deref(), Some("Ada"));
        assert_eq!(account.password_hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_new_account_builder_requires_email() {
        assert!(NewAccount::builder().build().is_err());
    }

    #[test]
    fn test_new_account_has_no_password() {
        let account = NewAccount::new("a@example.com".to_string());
        assert!(account.password_hash.is_none());
    }
}
