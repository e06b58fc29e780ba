use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use streetfix_core::{DomainError, IssueId, StaffId};

/// Maximum accepted title length.
pub const MAX_TITLE_LEN: usize = 200;

/// What kind of problem a citizen is reporting.
///
/// The serde names double as the stable codes persisted by the store; the
/// `Display` impl renders the human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IssueCategory {
    #[serde(rename = "POTHOLE")]
    Pothole,
    #[serde(rename = "STREET_LIGHTING")]
    StreetLighting,
    #[serde(rename = "GRAFFITI")]
    Graffiti,
    #[serde(rename = "ASB")]
    AntiSocialBehaviour,
    #[serde(rename = "FLY_TIPPING")]
    FlyTipping,
    #[serde(rename = "BLOCKED_DRAIN")]
    BlockedDrain,
    #[serde(rename = "OTHER")]
    #[default]
    Other,
}

impl IssueCategory {
    /// Stable code stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pothole => "POTHOLE",
            Self::StreetLighting => "STREET_LIGHTING",
            Self::Graffiti => "GRAFFITI",
            Self::AntiSocialBehaviour => "ASB",
            Self::FlyTipping => "FLY_TIPPING",
            Self::BlockedDrain => "BLOCKED_DRAIN",
            Self::Other => "OTHER",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "POTHOLE" => Some(Self::Pothole),
            "STREET_LIGHTING" => Some(Self::StreetLighting),
            "GRAFFITI" => Some(Self::Graffiti),
            "ASB" => Some(Self::AntiSocialBehaviour),
            "FLY_TIPPING" => Some(Self::FlyTipping),
            "BLOCKED_DRAIN" => Some(Self::BlockedDrain),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl core::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Pothole => "Pothole",
            Self::StreetLighting => "Street Lighting",
            Self::Graffiti => "Graffiti",
            Self::AntiSocialBehaviour => "Anti-Social Behaviour",
            Self::FlyTipping => "Fly-Tipping",
            Self::BlockedDrain => "Blocked Drains",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Triage lifecycle of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IssueStatus {
    #[serde(rename = "OPEN")]
    #[default]
    Open,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "RESOLVED")]
    Resolved,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl IssueStatus {
    /// Stable code stored in the database.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OPEN" => Some(Self::Open),
            "IN_PROGRESS" => Some(Self::InProgress),
            "RESOLVED" => Some(Self::Resolved),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl core::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        };
        f.write_str(label)
    }
}

/// A citizen-reported issue as the store holds it.
///
/// `ai_summary` starts empty and is written by the summary subsystem; an
/// empty string means "not summarised yet" and doubles as the re-trigger
/// signal after a failed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub ai_summary: String,
    pub category: IssueCategory,
    pub email: String,
    pub assigned_to: Option<StaffId>,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Materialize a new record from validated creation input.
    ///
    /// Summary, assignee and status take their creation defaults.
    pub fn new(input: NewIssue) -> Self {
        let now = Utc::now();
        Self {
            id: IssueId::new(),
            title: input.title,
            description: input.description,
            ai_summary: String::new(),
            category: input.category,
            email: input.email,
            assigned_to: None,
            status: IssueStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}

impl core::fmt::Display for Issue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (Status: {})", self.title, self.status)
    }
}

/// Validated input for creating an issue.
///
/// The description is deliberately unconstrained: empty and whitespace-only
/// descriptions are legal and the summary subsystem treats them as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub email: String,
}

impl NewIssue {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: IssueCategory,
        email: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into();
        let email = email.into();

        if title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        validate_email(&email)?;

        Ok(Self {
            title,
            description: description.into(),
            category,
            email,
        })
    }
}

/// Minimal shape check: one `@` with a non-empty local part and a domain
/// containing a dot. Deliverability is not our problem.
fn validate_email(email: &str) -> Result<(), DomainError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("email address is not valid"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return Err(DomainError::validation("email address is not valid"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewIssue {
        NewIssue::new(
            "Broken Street Light",
            "The street light on 5th Avenue is broken.",
            IssueCategory::StreetLighting,
            "user@example.com",
        )
        .unwrap()
    }

    #[test]
    fn new_issue_gets_creation_defaults() {
        let issue = Issue::new(
            NewIssue::new(
                "Pothole Issue",
                "A pothole in the road",
                IssueCategory::default(),
                "another@example.com",
            )
            .unwrap(),
        );

        assert_eq!(issue.category, IssueCategory::Other);
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.ai_summary, "");
        assert!(issue.assigned_to.is_none());
    }

    #[test]
    fn display_includes_title_and_status_label() {
        let issue = Issue::new(sample());
        assert_eq!(issue.to_string(), "Broken Street Light (Status: Open)");
    }

    #[test]
    fn category_codes_round_trip() {
        for category in [
            IssueCategory::Pothole,
            IssueCategory::StreetLighting,
            IssueCategory::Graffiti,
            IssueCategory::AntiSocialBehaviour,
            IssueCategory::FlyTipping,
            IssueCategory::BlockedDrain,
            IssueCategory::Other,
        ] {
            assert_eq!(IssueCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(IssueCategory::from_code("BONFIRE"), None);
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            IssueStatus::Open,
            IssueStatus::InProgress,
            IssueStatus::Resolved,
            IssueStatus::Closed,
        ] {
            assert_eq!(IssueStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(IssueStatus::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn serde_uses_store_codes() {
        let value = serde_json::to_value(IssueCategory::AntiSocialBehaviour).unwrap();
        assert_eq!(value, serde_json::json!("ASB"));
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = NewIssue::new("   ", "desc", IssueCategory::Other, "a@b.com").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn overlong_title_is_rejected() {
        let title = "x".repeat(MAX_TITLE_LEN + 1);
        let err = NewIssue::new(title, "desc", IssueCategory::Other, "a@b.com").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn bad_email_is_rejected() {
        for email in ["", "plainaddress", "@no-local.com", "user@", "user@nodot", "a b@c.com"] {
            assert!(
                NewIssue::new("t", "d", IssueCategory::Other, email).is_err(),
                "accepted {email:?}"
            );
        }
    }

    #[test]
    fn whitespace_description_is_accepted() {
        assert!(NewIssue::new("t", "   ", IssueCategory::Other, "a@b.com").is_ok());
    }
}
