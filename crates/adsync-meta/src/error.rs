use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors returned by the Graph API client.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("Meta API unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Non-2xx response without a Graph error body.
    #[error("Meta API returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The access token was rejected (Graph code 190 or HTTP 401).
    #[error("{reason}")]
    Auth { reason: GraphErrorReason },

    /// Graph refused the request.
    #[error("{reason}")]
    Rejected { reason: GraphErrorReason },

    #[error("failed to decode Meta response for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid Meta base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl MetaError {
    /// True for failures where the caller could not reach a working Graph
    /// endpoint at all.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            MetaError::Unavailable(_) => true,
            MetaError::HttpStatus { status } => *status >= 500,
            MetaError::Rejected { reason } => reason.is_transient(),
            _ => false,
        }
    }

    /// Text suitable for showing to the account owner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MetaError::Unavailable(_) => {
                "No response from Meta API. Please check your internet connection.".to_string()
            }
            MetaError::Deserialize { .. } => "Unexpected response from Meta API.".to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(body) else {
            if status == 401 {
                return MetaError::Auth {
                    reason: GraphErrorReason::TokenExpired,
                };
            }
            return MetaError::HttpStatus { status };
        };

        tracing::debug!(
            http_status = status,
            code = envelope.error.code,
            error_type = ?envelope.error.kind,
            subcode = ?envelope.error.error_subcode,
            message = %envelope.error.message,
            "graph api error"
        );
        let reason = GraphErrorReason::from_graph(&envelope.error);
        if envelope.error.code == 190 || status == 401 {
            MetaError::Auth { reason }
        } else {
            MetaError::Rejected { reason }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorEnvelope {
    pub error: GraphError,
}

/// The `error` object Graph returns on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    /// Graph sends this either as an object or as a JSON-encoded string.
    #[serde(default)]
    pub error_data: Option<Value>,
}

/// Fields whose rejection gets a dedicated message, in match order.
const BLAMEABLE_FIELDS: [&str; 7] = [
    "daily_budget",
    "lifetime_budget",
    "objective",
    "name",
    "status",
    "special_ad_categories",
    "buying_type",
];

impl GraphError {
    fn blamed_field(&self) -> Option<&'static str> {
        if let Some(field) = self.blame_field_from_data() {
            return Some(field);
        }
        BLAMEABLE_FIELDS
            .into_iter()
            .find(|field| self.message.contains(field))
    }

    fn blame_field_from_data(&self) -> Option<&'static str> {
        let data = match self.error_data.as_ref()? {
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
            other => other.clone(),
        };
        let specs = data.get("blame_field_specs")?.as_array()?;
        specs
            .iter()
            .flat_map(|spec| match spec {
                Value::Array(parts) => parts.iter().filter_map(Value::as_str).collect(),
                Value::String(s) => vec![s.as_str()],
                _ => Vec::new(),
            })
            .find_map(|name| BLAMEABLE_FIELDS.into_iter().find(|f| *f == name))
    }
}

/// Closed set of Graph failures the dashboard explains to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphErrorReason {
    BudgetTooLow,
    InvalidObjective,
    InvalidName,
    InvalidStatus,
    MissingSpecialAdCategories,
    InvalidBuyingType,
    InvalidParameter { message: String },
    TokenExpired,
    PermissionDenied,
    AppNotApproved,
    TemporarilyBlocked,
    Transient,
    Unmapped { code: i64, message: String },
}

impl GraphErrorReason {
    pub(crate) fn from_graph(error: &GraphError) -> Self {
        match error.code {
            100 => match error.blamed_field() {
                Some("daily_budget" | "lifetime_budget") => GraphErrorReason::BudgetTooLow,
                Some("objective") => GraphErrorReason::InvalidObjective,
                Some("name") => GraphErrorReason::InvalidName,
                Some("status") => GraphErrorReason::InvalidStatus,
                Some("special_ad_categories") => GraphErrorReason::MissingSpecialAdCategories,
                Some("buying_type") => GraphErrorReason::InvalidBuyingType,
                _ => GraphErrorReason::InvalidParameter {
                    message: error.message.clone(),
                },
            },
            190 => GraphErrorReason::TokenExpired,
            200 => GraphErrorReason::PermissionDenied,
            10 => GraphErrorReason::AppNotApproved,
            368 => GraphErrorReason::TemporarilyBlocked,
            2 => GraphErrorReason::Transient,
            code => GraphErrorReason::Unmapped {
                code,
                message: error.message.clone(),
            },
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GraphErrorReason::Transient | GraphErrorReason::TemporarilyBlocked
        )
    }
}

impl fmt::Display for GraphErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphErrorReason::BudgetTooLow => {
                f.write_str("Invalid daily budget. Minimum budget is $1.00 USD (100 cents).")
            }
            GraphErrorReason::InvalidObjective => f.write_str(
                "Invalid campaign objective. Must be one of: OUTCOME_LEADS, OUTCOME_SALES, \
                 OUTCOME_ENGAGEMENT, OUTCOME_AWARENESS, OUTCOME_TRAFFIC, OUTCOME_APP_PROMOTION",
            ),
            GraphErrorReason::InvalidName => {
                f.write_str("Invalid campaign name. Name must be between 1 and 255 characters.")
            }
            GraphErrorReason::InvalidStatus => {
                f.write_str("Invalid campaign status. Status must be ACTIVE or PAUSED.")
            }
            GraphErrorReason::MissingSpecialAdCategories => f.write_str(
                "Missing special_ad_categories. This field is required and must be a JSON string.",
            ),
            GraphErrorReason::InvalidBuyingType => {
                f.write_str("Invalid buying_type. Must be AUCTION.")
            }
            GraphErrorReason::InvalidParameter { message } => {
                write!(f, "Invalid parameter: {message}")
            }
            GraphErrorReason::TokenExpired => f.write_str(
                "Invalid or expired access token. Please reconnect your Meta account.",
            ),
            GraphErrorReason::PermissionDenied => f.write_str(
                "Permission error. Your access token needs ads_management permission.",
            ),
            GraphErrorReason::AppNotApproved => f.write_str(
                "Permission denied. Your app may not be approved for this action.",
            ),
            GraphErrorReason::TemporarilyBlocked => {
                f.write_str("Temporary issue with Meta API. Please try again in a few minutes.")
            }
            GraphErrorReason::Transient => {
                f.write_str("Meta API temporary issue. Please try again.")
            }
            GraphErrorReason::Unmapped { code, message } => {
                write!(f, "Meta API Error ({code}): {message}")
            }
        }
    }
}
