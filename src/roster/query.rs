//! Search query parsing and matching.

use super::model::Employee;
use crate::error::{Result, RosterError};

/// Page size used when the caller does not pass `limit`.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest page a single search may return.
pub const MAX_PAGE_SIZE: usize = 500;

/// A roster search: free text plus structured filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub org_id: i64,
    /// Case-insensitive substring over name, email and phone
    pub text: Option<String>,
    pub statuses: Vec<String>,
    pub locations: Vec<String>,
    pub departments: Vec<String>,
    pub positions: Vec<String>,
    pub offset: usize,
    pub limit: usize,
}

impl SearchQuery {
    /// A query matching every employee of `org_id`.
    pub fn for_org(org_id: i64) -> Self {
        Self {
            org_id,
            text: None,
            statuses: Vec::new(),
            locations: Vec::new(),
            departments: Vec::new(),
            positions: Vec::new(),
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Build a query from decoded query-string pairs.
    ///
    /// The filter keys `status`, `locations`, `departments` and `positions`
    /// may repeat. Unknown keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut query = Self::for_org(parse_org_id(pairs)?);

        for (key, value) in pairs {
            match key.as_str() {
                "q" if !value.is_empty() => query.text = Some(value.clone()),
                "status" => query.statuses.push(value.clone()),
                "locations" => query.locations.push(value.clone()),
                "departments" => query.departments.push(value.clone()),
                "positions" => query.positions.push(value.clone()),
                "offset" => query.offset = parse_usize("offset", value)?,
                "limit" => query.limit = parse_usize("limit", value)?.min(MAX_PAGE_SIZE),
                _ => {}
            }
        }

        Ok(query)
    }

    /// Whether `employee` satisfies every part of this query.
    pub fn matches(&self, employee: &Employee) -> bool {
        if employee.org_id != self.org_id {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&employee.status) {
            return false;
        }
        if !in_filter(&self.locations, &employee.location)
            || !in_filter(&self.departments, &employee.department)
            || !in_filter(&self.positions, &employee.position)
        {
            return false;
        }

        match &self.text {
            Some(text) => {
                let needle = text.to_lowercase();
                [
                    &employee.first_name,
                    &employee.last_name,
                    &employee.email,
                    &employee.phone,
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

fn in_filter(allowed: &[String], value: &Option<String>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    value.as_ref().is_some_and(|v| allowed.contains(v))
}

/// Extract the required `org_id` parameter.
pub fn parse_org_id(pairs: &[(String, String)]) -> Result<i64> {
    let raw = pairs
        .iter()
        .find(|(key, _)| key == "org_id")
        .map(|(_, value)| value)
        .ok_or_else(|| RosterError::InvalidRequest("org_id is required".to_string()))?;

    raw.parse()
        .map_err(|_| RosterError::InvalidRequest("org_id must be an integer".to_string()))
}

fn parse_usize(name: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| {
        RosterError::InvalidRequest(format!("{} must be a non-negative integer", name))
    })
}
