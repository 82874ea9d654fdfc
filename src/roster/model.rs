//! Roster data types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// An employee record belonging to one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub id: i64,
    pub org_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Employment status, e.g. `ACTIVE`, `NOT_STARTED`, `TERMINATED`
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn default_status() -> String {
    "ACTIVE".to_string()
}

impl Employee {
    /// Look up a column by name.
    ///
    /// Returns `None` for names that are not employee columns; a known column
    /// with no value yields `Some(Value::Null)`.
    pub fn column(&self, name: &str) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);

        let value = match name {
            "id" => Value::from(self.id),
            "org_id" => Value::from(self.org_id),
            "first_name" => text(&self.first_name),
            "last_name" => text(&self.last_name),
            "email" => text(&self.email),
            "phone" => text(&self.phone),
            "department" => text(&self.department),
            "position" => text(&self.position),
            "location" => text(&self.location),
            "status" => Value::String(self.status.clone()),
            "avatar_url" => text(&self.avatar_url),
            _ => return None,
        };
        Some(value)
    }

    /// Render only the given columns. Unknown columns render as `null`.
    pub fn project(&self, columns: &[String]) -> Map<String, Value> {
        columns
            .iter()
            .map(|c| (c.clone(), self.column(c).unwrap_or(Value::Null)))
            .collect()
    }
}

/// Per-organization column visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgConfig {
    pub org_id: i64,
    #[serde(default)]
    pub visible_columns: Vec<String>,
}

/// Distinct filter values present in an organization's roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FilterMetadata {
    pub statuses: Vec<String>,
    pub locations: Vec<String>,
    pub departments: Vec<String>,
    pub positions: Vec<String>,
}
