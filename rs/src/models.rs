//! Core data models for the teammate recommendation pipeline
//!
//! Record layouts mirror the exported employee and calendar tables, so field
//! names on the wire keep their upstream spelling (`ID`, `FULLNAME`, ...).

use crate::matrix::{CollaborationMatrix, DistanceMatrix};
use crate::search::EmployeeIndex;
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for employees
///
/// Upstream exports use both integer and string identifiers, so either is
/// accepted on input and normalized to its textual form.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(from = "RawId", into = "String")]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmployeeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<EmployeeId> for String {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}

/// Identifier as it appears in source records
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawId {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<RawId> for EmployeeId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Integer(n) => Self(n.to_string()),
            // Spreadsheet exports turn integer columns into floats
            RawId::Float(f) if f.fract() == 0.0 => Self(format!("{}", f as i64)),
            RawId::Float(f) => Self(f.to_string()),
            RawId::Text(s) => Self(s.trim().to_string()),
        }
    }
}

/// Unique identifier for meetings
pub type MeetingId = Uuid;

/// A point on the earth in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Employee reference record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    #[serde(rename = "ID")]
    pub id: EmployeeId,

    #[serde(rename = "FULLNAME")]
    pub full_name: String,

    /// Building or site the employee works from
    #[serde(rename = "Campus", default, deserialize_with = "text_or_number")]
    pub campus: Option<String>,

    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,

    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,

    /// Role, skills and experience; the text the semantic index is built over
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl Employee {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId::new(id),
            full_name: full_name.into(),
            campus: None,
            latitude: None,
            longitude: None,
            description: None,
        }
    }

    pub fn with_campus(mut self, campus: impl Into<String>) -> Self {
        self.campus = Some(campus.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Known location of the employee
    ///
    /// Missing coordinates and the exact origin (0, 0) both mean "unknown".
    pub fn location(&self) -> Option<GeoPoint> {
        let (latitude, longitude) = (self.latitude?, self.longitude?);
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        Some(GeoPoint {
            latitude,
            longitude,
        })
    }

    /// Whether both employees sit on the same, known campus
    pub fn shares_campus_with(&self, other: &Employee) -> bool {
        match (self.campus.as_deref(), other.campus.as_deref()) {
            (Some(a), Some(b)) => {
                let (a, b) = (a.trim(), b.trim());
                !a.is_empty() && a == b
            }
            _ => false,
        }
    }

    /// Text describing the employee for semantic matching
    pub fn profile_text(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", self.full_name, description)
            }
            _ => self.full_name.clone(),
        }
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|raw| EmployeeId::from(raw).0)
        .filter(|text| !text.is_empty()))
}

/// Historical meeting record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meeting {
    #[serde(rename = "meeting_id", default = "Uuid::new_v4")]
    pub id: MeetingId,

    #[serde(rename = "meeting_start_time", with = "timestamp")]
    pub start: NaiveDateTime,

    #[serde(rename = "meeting_end_time", with = "timestamp")]
    pub end: NaiveDateTime,

    /// Invited employees, in invitation order
    #[serde(rename = "invited_members", deserialize_with = "roster")]
    pub roster: Vec<EmployeeId>,
}

impl Meeting {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, roster: Vec<EmployeeId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            roster,
        }
    }

    pub fn invites(&self, employee: &EmployeeId) -> bool {
        self.roster.contains(employee)
    }
}

/// Rosters arrive either as a JSON list or as a list serialized into a string
///
/// Serialized lists may use single quotes around items (`"['a', 'b']"`). An
/// apostrophe inside an item is kept: a quote only closes an item when the
/// next non-blank character is a comma or the end of the list.
fn roster<'de, D>(deserializer: D) -> Result<Vec<EmployeeId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Roster {
        List(Vec<RawId>),
        Encoded(String),
    }

    let ids = match Roster::deserialize(deserializer)? {
        Roster::List(ids) => ids,
        Roster::Encoded(text) => match serde_json::from_str(&text) {
            Ok(ids) => ids,
            Err(_) => parse_quoted_list(&text).map_err(|e| {
                serde::de::Error::custom(format!("invalid invited_members list {text:?}: {e}"))
            })?,
        },
    };
    Ok(ids.into_iter().map(EmployeeId::from).collect())
}

/// Parse `[item, 'item', "item", ...]` where quoted items may contain quotes
fn parse_quoted_list(text: &str) -> Result<Vec<RawId>, String> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| "expected a bracketed list".to_string())?;
    let chars: Vec<char> = inner.chars().collect();
    let skip_blank = |mut i: usize| {
        while chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        i
    };

    let mut items = Vec::new();
    let mut i = skip_blank(0);
    while i < chars.len() {
        let item = match chars[i] {
            quote @ ('\'' | '"') => {
                let start = i + 1;
                let end = (start..chars.len())
                    .find(|&j| {
                        chars[j] == quote && matches!(chars.get(skip_blank(j + 1)), None | Some(','))
                    })
                    .ok_or_else(|| format!("unterminated item at offset {i}"))?;
                i = end + 1;
                RawId::Text(chars[start..end].iter().collect())
            }
            _ => {
                let start = i;
                while i < chars.len() && chars[i] != ',' {
                    i += 1;
                }
                let token: String = chars[start..i].iter().collect();
                let token = token.trim();
                if let Ok(n) = token.parse::<i64>() {
                    RawId::Integer(n)
                } else if let Ok(f) = token.parse::<f64>() {
                    RawId::Float(f)
                } else {
                    return Err(format!("unquoted item {token:?}"));
                }
            }
        };
        items.push(item);

        i = skip_blank(i);
        match chars.get(i) {
            None => break,
            Some(',') => i = skip_blank(i + 1),
            Some(c) => return Err(format!("unexpected {c:?} at offset {i}")),
        }
    }
    Ok(items)
}

/// Timestamp parsing shared by meeting records and requests
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// Parse a timestamp in RFC 3339 or one of the common naive layouts
    ///
    /// Offsets are normalized to UTC.
    pub fn parse(text: &str) -> anyhow::Result<NaiveDateTime> {
        let text = text.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Ok(parsed.naive_utc());
        }
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .ok_or_else(|| anyhow::anyhow!("unrecognized timestamp: {text:?}"))
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(OUTPUT_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) if !text.trim().is_empty() => super::parse(&text)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// Requested time window; a missing bound is open-ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether an interval overlaps the window; touching endpoints overlap
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        let ends_before = self.start.is_some_and(|window_start| end < window_start);
        let starts_after = self.end.is_some_and(|window_end| start > window_end);
        !(ends_before || starts_after)
    }
}

/// Ranking preference stated by the caller
///
/// Unrecognized values fall back to the composite ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(from = "Option<String>")]
pub enum Preference {
    Location,
    Collaboration,
    Expertise,
    /// Expertise, then distance, then collaboration
    #[default]
    #[serde(rename = "None")]
    Composite,
}

impl From<&str> for Preference {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "location" => Preference::Location,
            "collaboration" => Preference::Collaboration,
            "expertise" => Preference::Expertise,
            "" | "none" | "default" => Preference::Composite,
            other => {
                tracing::warn!("Unknown preference {:?}, using composite ranking", other);
                Preference::Composite
            }
        }
    }
}

impl From<Option<String>> for Preference {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Preference::from).unwrap_or_default()
    }
}

/// A single recommendation request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationRequest {
    /// Full names or free-text role descriptions, one per seat to fill
    pub participants: Vec<String>,

    /// Start of the window the candidates must be free in
    #[serde(default, with = "timestamp::option")]
    #[schemars(with = "Option<String>")]
    pub start_time: Option<NaiveDateTime>,

    /// End of the window the candidates must be free in
    #[serde(default, with = "timestamp::option")]
    #[schemars(with = "Option<String>")]
    pub end_time: Option<NaiveDateTime>,

    /// One of Location, Collaboration, Expertise or None
    #[serde(default)]
    pub preference: Preference,

    /// Employee the distance and collaboration scores are measured from
    pub reference_employee: EmployeeId,
}

impl RecommendationRequest {
    pub fn new(reference_employee: impl Into<EmployeeId>, participants: Vec<String>) -> Self {
        Self {
            participants,
            start_time: None,
            end_time: None,
            preference: Preference::default(),
            reference_employee: reference_employee.into(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }
}

/// How a participant term was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Recommended,
    /// Neither a name nor a semantic match was found
    NoMatch,
    /// Every matched candidate has a conflicting meeting
    NoneAvailable,
}

/// Recommendations for one participant term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleRecommendation {
    pub term: String,
    pub employee_ids: Vec<EmployeeId>,
    pub outcome: Outcome,
}

/// Recommendations for every participant term, in request order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RoleRecommendation>,
}

impl RecommendationResponse {
    /// Recommended employees for a term
    pub fn get(&self, term: &str) -> Option<&[EmployeeId]> {
        self.recommendations
            .iter()
            .find(|recommendation| recommendation.term == term)
            .map(|recommendation| recommendation.employee_ids.as_slice())
    }
}

/// Main storage interface trait
///
/// Abstracts over where reference data and batch artifacts live.
#[async_trait::async_trait]
pub trait StaffingStorage: Send + Sync {
    /// Employee reference records; unparsable rows are skipped
    async fn load_employees(&self) -> crate::Result<Vec<Employee>>;

    /// Historical meetings; unparsable rows are skipped
    async fn load_meetings(&self) -> crate::Result<Vec<Meeting>>;

    async fn load_distance_matrix(&self) -> crate::Result<DistanceMatrix>;

    async fn save_distance_matrix(&self, matrix: &DistanceMatrix) -> crate::Result<()>;

    async fn load_collaboration_matrix(&self) -> crate::Result<CollaborationMatrix>;

    async fn save_collaboration_matrix(&self, matrix: &CollaborationMatrix) -> crate::Result<()>;

    async fn load_employee_index(&self) -> crate::Result<EmployeeIndex>;

    async fn save_employee_index(&self, index: &EmployeeIndex) -> crate::Result<()>;
}
