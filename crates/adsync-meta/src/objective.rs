//! Mapping from dashboard objectives onto Graph's `OUTCOME_*` objectives.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteObjective {
    Sales,
    Leads,
    Traffic,
    Awareness,
    Engagement,
    AppPromotion,
}

impl RemoteObjective {
    pub const ALL: [RemoteObjective; 6] = [
        RemoteObjective::Leads,
        RemoteObjective::Sales,
        RemoteObjective::Engagement,
        RemoteObjective::Awareness,
        RemoteObjective::Traffic,
        RemoteObjective::AppPromotion,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteObjective::Sales => "OUTCOME_SALES",
            RemoteObjective::Leads => "OUTCOME_LEADS",
            RemoteObjective::Traffic => "OUTCOME_TRAFFIC",
            RemoteObjective::Awareness => "OUTCOME_AWARENESS",
            RemoteObjective::Engagement => "OUTCOME_ENGAGEMENT",
            RemoteObjective::AppPromotion => "OUTCOME_APP_PROMOTION",
        }
    }

    /// Maps a legacy or `OUTCOME_*` objective. `None` for anything else.
    #[must_use]
    pub fn from_local(objective: &str) -> Option<Self> {
        let objective = match objective.trim().to_ascii_uppercase().as_str() {
            "CONVERSIONS" | "PRODUCT_CATALOG_SALES" | "OUTCOME_SALES" => RemoteObjective::Sales,
            "LEAD_GENERATION" | "OUTCOME_LEADS" => RemoteObjective::Leads,
            "LINK_CLICKS" | "STORE_VISITS" | "OUTCOME_TRAFFIC" => RemoteObjective::Traffic,
            "BRAND_AWARENESS" | "REACH" | "OUTCOME_AWARENESS" => RemoteObjective::Awareness,
            "VIDEO_VIEWS" | "POST_ENGAGEMENT" | "PAGE_LIKES" | "MESSAGES" | "EVENT_RESPONSES"
            | "OUTCOME_ENGAGEMENT" => RemoteObjective::Engagement,
            "APP_INSTALLS" | "OUTCOME_APP_PROMOTION" => RemoteObjective::AppPromotion,
            _ => return None,
        };
        Some(objective)
    }
}

impl fmt::Display for RemoteObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Like [`RemoteObjective::from_local`] but falls back to
/// `OUTCOME_TRAFFIC` for unrecognized values.
#[must_use]
pub fn remap_objective(objective: &str) -> RemoteObjective {
    RemoteObjective::from_local(objective).unwrap_or_else(|| {
        tracing::warn!(
            objective,
            fallback = RemoteObjective::Traffic.as_str(),
            "unrecognized campaign objective; using fallback"
        );
        RemoteObjective::Traffic
    })
}
