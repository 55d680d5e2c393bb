//! DHIS2 Web API payloads.

use std::fmt;
use std::str::FromStr;

use era5_common::{MultiPolygon, Period};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Dhis2Error, Dhis2Result};

/// `GET /api/system/info`, the fields the importer logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub server_date: Option<String>,
}

/// An organisation unit with a polygonal boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgUnit {
    pub id: String,
    pub name: String,
    pub level: Option<u32>,
    pub geometry: MultiPolygon,
}

/// One `(data element, org unit, period, value)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub data_element: String,
    pub org_unit: String,
    pub period: String,
    pub value: String,
}

impl DataValue {
    pub fn parsed_period(&self) -> Option<Period> {
        self.period.parse().ok()
    }
}

/// Body of `POST /api/dataValueSets` and of its `GET` counterpart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueSet {
    #[serde(default)]
    pub data_values: Vec<DataValue>,
}

impl DataValueSet {
    pub fn len(&self) -> usize {
        self.data_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_values.is_empty()
    }
}

/// Latest period among `values`, by the last day each period covers.
///
/// Periods that are neither daily nor monthly are ignored.
pub fn latest_period<'a, I>(values: I) -> Option<Period>
where
    I: IntoIterator<Item = &'a DataValue>,
{
    values
        .into_iter()
        .filter_map(DataValue::parsed_period)
        .max_by_key(|p| p.last_day())
}

/// `importStrategy` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportStrategy {
    #[default]
    CreateAndUpdate,
    Create,
    Update,
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStrategy::CreateAndUpdate => "CREATE_AND_UPDATE",
            ImportStrategy::Create => "CREATE",
            ImportStrategy::Update => "UPDATE",
        }
    }
}

impl FromStr for ImportStrategy {
    type Err = Dhis2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CREATE_AND_UPDATE" => Ok(ImportStrategy::CreateAndUpdate),
            "CREATE" => Ok(ImportStrategy::Create),
            "UPDATE" => Ok(ImportStrategy::Update),
            _ => Err(Dhis2Error::UnknownImportStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ImportCount {
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub ignored: u64,
    #[serde(default)]
    pub deleted: u64,
}

impl fmt::Display for ImportCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported={} updated={} ignored={} deleted={}",
            self.imported, self.updated, self.ignored, self.deleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportConflict {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Result of a data-value import.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    #[serde(default)]
    pub status: String,
    pub import_count: ImportCount,
    #[serde(default)]
    pub conflicts: Vec<ImportConflict>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ImportSummary {
    /// Parse either the bare summary (DHIS2 before 2.38) or the
    /// `{ "response": { ... } }` web-message envelope used since.
    pub fn from_json(value: Value) -> Dhis2Result<Self> {
        let inner = match value.get("response") {
            Some(response) if response.is_object() => response.clone(),
            _ => value,
        };
        Ok(serde_json::from_value(inner)?)
    }

    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("ERROR")
    }
}
