use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned record identifier. Opaque to the client; numeric ids are
/// kept in their decimal text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl<'de> Deserialize<'de> for ApplicationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApplicationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ApplicationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: ApplicationId,
    pub company: String,
    #[serde(default)]
    pub position: String,
    pub status: String, // kept verbatim, see StatusCategory for display
    /// Missing, null or unreadable dates decode as `None` so the record still lists.
    #[serde(default, with = "wire_date", skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ApplicationRecord {
    pub fn category(&self) -> StatusCategory {
        StatusCategory::of(&self.status)
    }

    /// Short date form used in listings, e.g. `03/14/2025`; `-` when unknown.
    pub fn applied_display(&self) -> String {
        match self.applied_date {
            Some(date) => date.format("%m/%d/%Y").to_string(),
            None => "-".to_string(),
        }
    }

    /// The editable part of this record, used to seed an update.
    pub fn to_draft(&self) -> ApplicationDraft {
        ApplicationDraft {
            company: self.company.clone(),
            position: self.position.clone(),
            status: canonical_status(&self.status),
            applied_date: self.applied_date,
            resume_link: self.resume_link.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// Create/update payload: a record without its server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub company: String,
    pub position: String,
    pub status: String,
    /// Left out of the payload when unknown, so an update keeps the stored date.
    #[serde(with = "wire_date", skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ApplicationDraft {
    pub fn new(company: &str, position: &str, status: &str, applied_date: NaiveDate) -> Self {
        Self {
            company: company.to_string(),
            position: position.to_string(),
            status: canonical_status(status),
            applied_date: Some(applied_date),
            resume_link: None,
            notes: None,
        }
    }

    pub fn with_resume_link(mut self, link: Option<String>) -> Self {
        self.resume_link = link;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = canonical_status(status);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Applied,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
    ];

    /// Case-insensitive lookup of one of the four known statuses.
    pub fn parse(s: &str) -> Option<Status> {
        match s.to_lowercase().as_str() {
            "applied" => Some(Status::Applied),
            "interview" => Some(Status::Interview),
            "offer" => Some(Status::Offer),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interview => "Interview",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
        }
    }

    /// Next status in pipeline order, wrapping after `Rejected`.
    pub fn next(self) -> Status {
        match self {
            Status::Applied => Status::Interview,
            Status::Interview => Status::Offer,
            Status::Offer => Status::Rejected,
            Status::Rejected => Status::Applied,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical spelling for a known status; anything else is returned unchanged.
pub fn canonical_status(s: &str) -> String {
    match Status::parse(s) {
        Some(status) => status.as_str().to_string(),
        None => s.to_string(),
    }
}

/// Display bucket for a status string. Only drives styling, never validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    Applied,
    Interview,
    Offer,
    Rejected,
    Unknown,
}

impl StatusCategory {
    pub const ALL: [StatusCategory; 5] = [
        StatusCategory::Applied,
        StatusCategory::Interview,
        StatusCategory::Offer,
        StatusCategory::Rejected,
        StatusCategory::Unknown,
    ];

    pub fn of(status: &str) -> StatusCategory {
        match Status::parse(status) {
            Some(Status::Applied) => StatusCategory::Applied,
            Some(Status::Interview) => StatusCategory::Interview,
            Some(Status::Offer) => StatusCategory::Offer,
            Some(Status::Rejected) => StatusCategory::Rejected,
            None => StatusCategory::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusCategory::Applied => "applied",
            StatusCategory::Interview => "interview",
            StatusCategory::Offer => "offer",
            StatusCategory::Rejected => "rejected",
            StatusCategory::Unknown => "unknown",
        }
    }

    fn index(&self) -> usize {
        match self {
            StatusCategory::Applied => 0,
            StatusCategory::Interview => 1,
            StatusCategory::Offer => 2,
            StatusCategory::Rejected => 3,
            StatusCategory::Unknown => 4,
        }
    }
}

/// Status filter. `Exact` compares the raw status string case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Exact(String),
}

impl StatusFilter {
    pub fn parse(s: &str) -> StatusFilter {
        if s == "All" {
            StatusFilter::All
        } else {
            StatusFilter::Exact(s.to_string())
        }
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Exact(status) => record.status == *status,
        }
    }

    /// Steps through the dropdown choices: All, then each known status.
    /// A free-form filter goes back to All.
    pub fn cycle(&self) -> StatusFilter {
        match self {
            StatusFilter::All => StatusFilter::Exact(Status::Applied.as_str().to_string()),
            StatusFilter::Exact(s) => match Status::ALL.iter().position(|st| st.as_str() == s) {
                Some(i) if i + 1 < Status::ALL.len() => {
                    StatusFilter::Exact(Status::ALL[i + 1].as_str().to_string())
                }
                _ => StatusFilter::All,
            },
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Exact(s) => f.write_str(s),
        }
    }
}

/// Per-category counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    counts: [usize; 5],
}

impl StatusSummary {
    pub fn of<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ApplicationRecord>,
    {
        let mut summary = Self::default();
        for record in records {
            summary.counts[record.category().index()] += 1;
        }
        summary
    }

    pub fn count(&self, category: StatusCategory) -> usize {
        self.counts[category.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = StatusCategory::ALL
            .iter()
            .filter(|c| **c != StatusCategory::Unknown || self.count(**c) > 0)
            .map(|c| format!("{}: {}", c.label(), self.count(*c)))
            .collect();
        write!(f, "Total: {} | {}", self.total(), parts.join(" | "))
    }
}

/// `appliedDate` is written as `YYYY-MM-DD`. On read the server may send either
/// a plain date or a full RFC 3339 timestamp; anything else reads as `None`.
mod wire_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        let date = raw.as_ref().and_then(|v| v.as_str()).and_then(parse);
        if date.is_none() {
            if let Some(value) = raw.filter(|v| !v.is_null()) {
                tracing::warn!(%value, "unreadable appliedDate");
            }
        }
        Ok(date)
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        // Offset-less timestamps such as `2025-03-14T00:00:00`
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }
}

pub use wire_date::parse as parse_date;
