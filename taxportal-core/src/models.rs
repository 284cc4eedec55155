use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Storage key holding the sequence of tax returns
pub const RETURNS_KEY: &str = "returns";
/// Storage key holding the logged-in user
pub const USER_KEY: &str = "demoUser";
/// Storage key holding the profile written at registration
pub const PROFILE_KEY: &str = "userProfile";
/// Storage key holding the activity log
pub const ACTIVITY_KEY: &str = "activityLog";

/// Today's date in UTC, the granularity used for return and document dates
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Generates a fresh record identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// IRS form the return is filed on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReturnType {
    /// Individual income tax return
    #[serde(rename = "1040")]
    Form1040,
    /// Partnership income tax return
    #[serde(rename = "1065")]
    Form1065,
}

impl ReturnType {
    /// The form number as shown to users and matched by search
    pub fn code(&self) -> &'static str {
        match self {
            ReturnType::Form1040 => "1040",
            ReturnType::Form1065 => "1065",
        }
    }

    /// Long description of the form
    pub fn description(&self) -> &'static str {
        match self {
            ReturnType::Form1040 => "Individual Income Tax Return",
            ReturnType::Form1065 => "Partnership Income Tax Return",
        }
    }

    /// Parse a return type from user input ("1040", "form1065", ...)
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.trim_start_matches("form").trim() {
            "1040" => Some(ReturnType::Form1040),
            "1065" => Some(ReturnType::Form1065),
            _ => None,
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Review status of a return
///
/// Any status may be set from any other; no transition graph is enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReturnStatus {
    Pending,
    #[serde(rename = "In Review")]
    InReview,
    Completed,
}

impl ReturnStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "Pending",
            ReturnStatus::InReview => "In Review",
            ReturnStatus::Completed => "Completed",
        }
    }

    /// Parse a status from user input, ignoring case and separators
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "pending" => Some(ReturnStatus::Pending),
            "inreview" | "review" => Some(ReturnStatus::InReview),
            "completed" | "complete" | "done" => Some(ReturnStatus::Completed),
            _ => None,
        }
    }

    pub fn all() -> [ReturnStatus; 3] {
        [
            ReturnStatus::Pending,
            ReturnStatus::InReview,
            ReturnStatus::Completed,
        ]
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse classification of an attached document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Image,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "PDF"),
            DocumentKind::Docx => write!(f, "DOCX"),
            DocumentKind::Image => write!(f, "IMAGE"),
        }
    }
}

/// A supporting document attached to a return
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique within the owning return
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub upload_date: NaiveDate,
    #[serde(default)]
    pub comments: String,
}

impl Document {
    /// Size in megabytes, formatted the way the upload list shows it
    pub fn size_display(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

/// A tax-filing record with attached documents and a review status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaxReturn {
    /// Assigned at creation, never changed afterwards
    pub id: String,

    /// Optional display name (seeded returns carry the client's name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub return_type: ReturnType,

    pub status: ReturnStatus,

    #[serde(default)]
    pub documents: Vec<Document>,

    /// Cached `documents.len()`, refreshed on every create/update
    #[serde(default)]
    pub document_count: usize,

    #[serde(default)]
    pub notes: String,

    pub created_date: NaiveDate,

    pub last_updated: NaiveDate,
}

impl TaxReturn {
    /// Name used in listings and status-change log lines
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("Return #{}", self.id),
        }
    }

    /// Gets a document by ID
    pub fn get_document(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == document_id)
    }

    /// Removes a document by ID, returning it if it was attached
    pub fn remove_document(&mut self, document_id: &str) -> Option<Document> {
        let pos = self.documents.iter().position(|d| d.id == document_id)?;
        Some(self.documents.remove(pos))
    }

    /// Replaces the comment on a document; returns false if the document is unknown
    pub fn set_document_comment(&mut self, document_id: &str, comment: &str) -> bool {
        match self.documents.iter_mut().find(|d| d.id == document_id) {
            Some(doc) => {
                doc.comments = comment.to_string();
                true
            }
            None => false,
        }
    }
}

/// Fields supplied when creating a return
#[derive(Debug, Clone)]
pub struct ReturnInput {
    pub name: Option<String>,
    pub return_type: ReturnType,
    pub documents: Vec<Document>,
    pub notes: String,
}

impl ReturnInput {
    pub fn new(return_type: ReturnType) -> Self {
        Self {
            name: None,
            return_type,
            documents: Vec::new(),
            notes: String::new(),
        }
    }
}

/// Partial update merged into an existing return; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ReturnPatch {
    pub name: Option<String>,
    pub return_type: Option<ReturnType>,
    pub documents: Option<Vec<Document>>,
    pub notes: Option<String>,
}

impl ReturnPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.return_type.is_none()
            && self.documents.is_none()
            && self.notes.is_none()
    }
}

/// One line of the append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub action: String,
    pub entity_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// The logged-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: String,
}

impl User {
    /// The email or phone number the user signed in with
    pub fn identity_label(&self) -> &str {
        self.email
            .as_deref()
            .or(self.phone_number.as_deref())
            .unwrap_or("-")
    }
}

/// Profile captured during registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Per-status counters shown above the returns table
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStats {
    pub total: usize,
    pub pending: usize,
    pub in_review: usize,
    pub completed: usize,
}

impl ReturnStats {
    pub fn from_returns(returns: &[TaxReturn]) -> Self {
        let mut stats = ReturnStats {
            total: returns.len(),
            ..Default::default()
        };
        for r in returns {
            match r.status {
                ReturnStatus::Pending => stats.pending += 1,
                ReturnStatus::InReview => stats.in_review += 1,
                ReturnStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_return() -> TaxReturn {
        TaxReturn {
            id: "r1".to_string(),
            name: None,
            return_type: ReturnType::Form1065,
            status: ReturnStatus::InReview,
            documents: vec![Document {
                id: "d1".to_string(),
                name: "k1.pdf".to_string(),
                kind: DocumentKind::Pdf,
                size_bytes: 2048,
                upload_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                comments: String::new(),
            }],
            document_count: 1,
            notes: String::new(),
            created_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            last_updated: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        }
    }

    #[test]
    fn test_persisted_field_names() {
        let json = serde_json::to_value(sample_return()).unwrap();
        assert_eq!(json["type"], "1065");
        assert_eq!(json["status"], "In Review");
        assert_eq!(json["documentCount"], 1);
        assert_eq!(json["createdDate"], "2024-03-01");
        assert_eq!(json["lastUpdated"], "2024-03-02");
        assert_eq!(json["documents"][0]["type"], "pdf");
        assert_eq!(json["documents"][0]["size"], 2048);
        assert_eq!(json["documents"][0]["uploadDate"], "2024-03-01");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_parse_status_and_type() {
        assert_eq!(ReturnStatus::parse("in review"), Some(ReturnStatus::InReview));
        assert_eq!(ReturnStatus::parse("In-Review"), Some(ReturnStatus::InReview));
        assert_eq!(ReturnStatus::parse("COMPLETED"), Some(ReturnStatus::Completed));
        assert_eq!(ReturnStatus::parse("archived"), None);
        assert_eq!(ReturnType::parse("1040"), Some(ReturnType::Form1040));
        assert_eq!(ReturnType::parse("Form 1065"), Some(ReturnType::Form1065));
        assert_eq!(ReturnType::parse("1120"), None);
    }

    #[test]
    fn test_document_editing() {
        let mut r = sample_return();
        assert!(r.set_document_comment("d1", "Schedule K-1"));
        assert_eq!(r.get_document("d1").unwrap().comments, "Schedule K-1");
        assert!(!r.set_document_comment("missing", "x"));

        let removed = r.remove_document("d1").unwrap();
        assert_eq!(removed.name, "k1.pdf");
        assert!(r.documents.is_empty());
        assert!(r.remove_document("d1").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut r = sample_return();
        assert_eq!(r.display_name(), "Return #r1");
        r.name = Some("Acme Partners".to_string());
        assert_eq!(r.display_name(), "Acme Partners");
    }

    #[test]
    fn test_stats() {
        let mut a = sample_return();
        a.status = ReturnStatus::Pending;
        let b = sample_return();
        let mut c = sample_return();
        c.status = ReturnStatus::Completed;
        let stats = ReturnStats::from_returns(&[a, b, c]);
        assert_eq!(
            stats,
            ReturnStats {
                total: 3,
                pending: 1,
                in_review: 1,
                completed: 1
            }
        );
    }
}
