//! Roster storage.
//!
//! Handlers only see the [`RosterStore`] trait. The shipped implementation
//! keeps everything in memory and can be seeded from a YAML document.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use super::model::{Employee, FilterMetadata, OrgConfig};
use super::query::SearchQuery;
use crate::error::{Result, RosterError};

/// Read access to employee rosters.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Visible columns configured for `org_id`, if the org has a config.
    async fn org_columns(&self, org_id: i64) -> Result<Option<Vec<String>>>;

    /// Employees matching `query`, ordered by id and paged.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Employee>>;

    /// Distinct filter values for `org_id`.
    async fn filter_metadata(&self, org_id: i64) -> Result<FilterMetadata>;
}

/// Initial contents for an [`InMemoryRosterStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterSeed {
    #[serde(default)]
    pub org_configs: Vec<OrgConfig>,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

impl RosterSeed {
    /// Load a seed from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading roster seed");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a seed from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RosterError::Config(format!("Failed to parse roster seed: {}", e)))
    }
}

/// A roster store held entirely in memory.
#[derive(Default)]
pub struct InMemoryRosterStore {
    employees: RwLock<Vec<Employee>>,
    org_configs: RwLock<HashMap<i64, OrgConfig>>,
}

impl InMemoryRosterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the seed's contents.
    pub fn from_seed(seed: RosterSeed) -> Self {
        let store = Self::new();
        for config in seed.org_configs {
            store.upsert_org_config(config);
        }
        for employee in seed.employees {
            store.insert_employee(employee);
        }
        store
    }

    /// Add an employee.
    pub fn insert_employee(&self, employee: Employee) {
        self.employees.write().push(employee);
    }

    /// Add or replace an org's column config.
    pub fn upsert_org_config(&self, config: OrgConfig) {
        self.org_configs.write().insert(config.org_id, config);
    }

    /// Number of employees across all orgs.
    pub fn employee_count(&self) -> usize {
        self.employees.read().len()
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn org_columns(&self, org_id: i64) -> Result<Option<Vec<String>>> {
        Ok(self
            .org_configs
            .read()
            .get(&org_id)
            .map(|c| c.visible_columns.clone()))
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Employee>> {
        let mut matched: Vec<Employee> = self
            .employees
            .read()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.id);

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn filter_metadata(&self, org_id: i64) -> Result<FilterMetadata> {
        let employees = self.employees.read();
        let in_org: Vec<&Employee> = employees.iter().filter(|e| e.org_id == org_id).collect();

        let distinct = |field: fn(&Employee) -> Option<&String>| {
            in_org
                .iter()
                .filter_map(|e| field(e))
                .cloned()
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect::<Vec<_>>()
        };

        Ok(FilterMetadata {
            statuses: distinct(|e| Some(&e.status)),
            locations: distinct(|e| e.location.as_ref()),
            departments: distinct(|e| e.department.as_ref()),
            positions: distinct(|e| e.position.as_ref()),
        })
    }
}
