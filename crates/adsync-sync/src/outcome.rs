use adsync_core::Campaign;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

pub const CREDENTIALS_MISSING_MESSAGE: &str =
    "Meta credentials not configured. Please connect your Meta account in Settings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The campaign only exists locally.
    NotLinked,
    NoCredentials,
    /// The change touched no field the Graph API knows about.
    NothingToSync,
}

/// What happened on the remote side of a dual write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Synced,
    Skipped(SkipReason),
    Failed(String),
}

impl RemoteOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, RemoteOutcome::Synced)
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            RemoteOutcome::Failed(message) => Some(message),
            RemoteOutcome::Skipped(SkipReason::NoCredentials) => Some(CREDENTIALS_MISSING_MESSAGE),
            _ => None,
        }
    }
}

/// Serializes as `{"remoteSynced": bool, "remoteError": string?}`.
impl Serialize for RemoteOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let error = self.error_message();
        let mut state =
            serializer.serialize_struct("RemoteOutcome", if error.is_some() { 2 } else { 1 })?;
        state.serialize_field("remoteSynced", &self.is_synced())?;
        if let Some(error) = error {
            state.serialize_field("remoteError", error)?;
        }
        state.end()
    }
}

/// Result of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    /// Remote campaigns considered in this pass.
    pub total: usize,
    /// The owner's full campaign list after the pass.
    #[serde(skip)]
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub campaign: Campaign,
    pub remote: RemoteOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub campaign: Campaign,
    pub remote: RemoteOutcome,
    /// Keys dropped from the request because they are not updatable.
    pub rejected_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub campaign_name: String,
    pub remote: RemoteOutcome,
}

impl DeleteOutcome {
    #[must_use]
    pub fn remote_deleted(&self) -> bool {
        self.remote.is_synced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serializes_error() {
        let value = serde_json::to_value(RemoteOutcome::Failed("boom".to_string())).unwrap();
        assert_eq!(value, serde_json::json!({"remoteSynced": false, "remoteError": "boom"}));
    }

    #[test]
    fn synced_outcome_has_no_error() {
        let value = serde_json::to_value(RemoteOutcome::Synced).unwrap();
        assert_eq!(value, serde_json::json!({"remoteSynced": true}));
    }

    #[test]
    fn missing_credentials_explain_themselves() {
        let outcome = RemoteOutcome::Skipped(SkipReason::NoCredentials);
        assert_eq!(outcome.error_message(), Some(CREDENTIALS_MISSING_MESSAGE));
        assert_eq!(RemoteOutcome::Skipped(SkipReason::NotLinked).error_message(), None);
    }
}
