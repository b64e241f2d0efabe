use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Currency;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "client" => Ok(Role::Client),
            _ => Err(CoreError::InvalidRole(s.to_string())),
        }
    }
}

/// Trims and lower-cases an email address for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub meta_access_token: Option<String>,
    pub meta_ad_account_id: Option<String>,
    pub meta_page_id: Option<String>,
    pub company_name: Option<String>,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    #[must_use]
    pub fn has_meta_token(&self) -> bool {
        self.meta_access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    #[must_use]
    pub fn has_meta_ad_account(&self) -> bool {
        self.meta_ad_account_id
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }

    /// The projection the sync engine works with.
    #[must_use]
    pub fn owner(&self) -> Owner {
        Owner {
            id: self.id,
            currency: self.currency,
            credential: RemoteCredential::from_parts(
                self.meta_access_token.as_deref(),
                self.meta_ad_account_id.as_deref(),
            ),
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("role", &self.role)
            .field(
                "meta_access_token",
                &self.meta_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("meta_ad_account_id", &self.meta_ad_account_id)
            .field("meta_page_id", &self.meta_page_id)
            .field("company_name", &self.company_name)
            .field("currency", &self.currency)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub company_name: Option<String>,
    pub currency: Currency,
}

/// Graph credentials plus the display currency chosen alongside them.
#[derive(Clone)]
pub struct CredentialUpdate {
    pub access_token: String,
    pub ad_account_id: String,
    pub page_id: Option<String>,
    pub currency: Option<Currency>,
}

impl fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialUpdate")
            .field("access_token", &"[redacted]")
            .field("ad_account_id", &self.ad_account_id)
            .field("page_id", &self.page_id)
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredential {
    pub access_token: String,
    pub ad_account_id: String,
}

impl RemoteCredential {
    /// Returns a credential only when both the token and the account id are
    /// non-blank.
    #[must_use]
    pub fn from_parts(access_token: Option<&str>, ad_account_id: Option<&str>) -> Option<Self> {
        let token = access_token.map(str::trim).filter(|t| !t.is_empty())?;
        let account = ad_account_id.map(str::trim).filter(|a| !a.is_empty())?;
        Some(Self {
            access_token: token.to_string(),
            ad_account_id: account.to_string(),
        })
    }
}

impl fmt::Debug for RemoteCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredential")
            .field("access_token", &"[redacted]")
            .field("ad_account_id", &self.ad_account_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Owner {
    pub id: Uuid,
    pub currency: Currency,
    pub credential: Option<RemoteCredential>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_requires_both_parts() {
        assert!(RemoteCredential::from_parts(Some("tok"), Some("123")).is_some());
        assert!(RemoteCredential::from_parts(Some("tok"), None).is_none());
        assert!(RemoteCredential::from_parts(None, Some("123")).is_none());
        assert!(RemoteCredential::from_parts(Some("  "), Some("123")).is_none());
    }

    #[test]
    fn credential_debug_hides_token() {
        let cred = RemoteCredential::from_parts(Some("EAAB-secret"), Some("act_1")).unwrap();
        let debug = format!("{cred:?}");
        assert!(!debug.contains("EAAB-secret"));
        assert!(debug.contains("act_1"));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::Client.as_str(), "client");
        assert!("owner".parse::<Role>().is_err());
    }
}
