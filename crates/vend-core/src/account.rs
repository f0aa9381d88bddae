//! Account requests and the directory-event trigger.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VendError};

/// A request to provision one managed account.
///
/// `name` is the unique key and becomes the stack name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl AccountRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        AccountRequest {
            name: name.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Derive a request from a directory user's primary email.
    ///
    /// name is the local-part (everything before the first `@`), first name
    /// is its first character and last name the remaining characters. The
    /// derivation is intentionally literal: `jdoe@x.com` yields `j` / `doe`.
    pub fn from_directory_email(email: &str) -> Result<Self> {
        let local = email.split('@').next().unwrap_or_default();
        let mut chars = local.chars();
        let first = chars.next().ok_or_else(|| {
            VendError::InvalidRequest(format!("email '{}' has an empty local-part", email))
        })?;

        Ok(AccountRequest {
            name: local.to_string(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: chars.as_str().to_string(),
        })
    }

    /// Reject requests without a name or email.
    ///
    /// First and last name may be empty; a one-character local-part derives
    /// an empty last name.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("name", &self.name), ("email", &self.email)] {
            if value.trim().is_empty() {
                return Err(VendError::InvalidRequest(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

/// Directory change notification naming the affected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEvent {
    pub primary_email: String,
}

impl DirectoryEvent {
    /// Parse a notification body; unknown fields are ignored.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn to_account_request(&self) -> Result<AccountRequest> {
        AccountRequest::from_directory_email(&self.primary_email)
    }
}
