//! HTTP client for the DHIS2 Web API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use era5_common::{DateRange, Period};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::error::{Dhis2Error, Dhis2Result};
use crate::org_units::OrgUnitFeatures;
use crate::types::{
    latest_period, DataValueSet, ImportStrategy, ImportSummary, OrgUnit, SystemInfo,
};

/// Org units per `dataValueSets` query, keeping URLs well under proxy limits.
pub const ORG_UNIT_CHUNK: usize = 50;

/// The DHIS2 operations the importer depends on.
#[async_trait]
pub trait Dhis2Api: Send + Sync {
    /// Server version, for a connectivity check.
    async fn system_info(&self) -> Dhis2Result<SystemInfo>;

    /// Org units at `level` that have a polygon boundary.
    async fn org_units_geojson(&self, level: u32) -> Dhis2Result<Vec<OrgUnit>>;

    /// Latest period with a stored value for `data_element` among
    /// `org_units` within `range`.
    async fn latest_imported_period(
        &self,
        data_element: &str,
        org_units: &[String],
        range: &DateRange,
    ) -> Dhis2Result<Option<Period>>;

    /// Write data values.
    async fn import_data_values(
        &self,
        payload: &DataValueSet,
        strategy: ImportStrategy,
    ) -> Dhis2Result<ImportSummary>;
}

#[derive(Clone)]
pub struct Dhis2Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl Dhis2Config {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl fmt::Debug for Dhis2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dhis2Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct Dhis2Client {
    client: Client,
    config: Dhis2Config,
}

impl Dhis2Client {
    pub fn new(config: Dhis2Config) -> Dhis2Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    /// Absolute URL of an API path such as `system/info`.
    pub fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/api").unwrap_or(base);
        format!("{}/api/{}", base, path.trim_start_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.config.username, Some(&self.config.password))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Dhis2Result<T> {
        let url = self.api_url(path);
        debug!(url = %url, "GET");
        let response = self
            .authed(self.client.get(&url))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Dhis2Error::Http { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Dhis2Api for Dhis2Client {
    async fn system_info(&self) -> Dhis2Result<SystemInfo> {
        self.get_json("system/info", &[]).await
    }

    #[instrument(skip(self))]
    async fn org_units_geojson(&self, level: u32) -> Dhis2Result<Vec<OrgUnit>> {
        let features: OrgUnitFeatures = self
            .get_json("organisationUnits.geojson", &[("level", level.to_string())])
            .await?;

        let total = features.len();
        let (org_units, skipped) = features.into_org_units();

        if !skipped.is_empty() {
            warn!(
                count = skipped.len(),
                org_units = ?skipped,
                "Org units without usable polygon geometry are skipped"
            );
        }
        info!(level, total, usable = org_units.len(), "Fetched org units");
        Ok(org_units)
    }

    #[instrument(skip(self, org_units, range), fields(org_units = org_units.len(), range = %range))]
    async fn latest_imported_period(
        &self,
        data_element: &str,
        org_units: &[String],
        range: &DateRange,
    ) -> Dhis2Result<Option<Period>> {
        let mut latest: Option<Period> = None;

        for chunk in org_units.chunks(ORG_UNIT_CHUNK) {
            let mut query = vec![
                ("dataElement", data_element.to_string()),
                ("startDate", range.start.to_string()),
                ("endDate", range.end.to_string()),
            ];
            query.extend(chunk.iter().map(|ou| ("orgUnit", ou.clone())));

            let set: DataValueSet = self.get_json("dataValueSets.json", &query).await?;
            let chunk_latest = latest_period(&set.data_values);
            latest = match (latest, chunk_latest) {
                (Some(a), Some(b)) => Some(if b.last_day() > a.last_day() { b } else { a }),
                (a, b) => a.or(b),
            };
        }

        debug!(latest = ?latest.map(|p| p.id()), "Latest imported period");
        Ok(latest)
    }

    #[instrument(skip(self, payload), fields(values = payload.len()))]
    async fn import_data_values(
        &self,
        payload: &DataValueSet,
        strategy: ImportStrategy,
    ) -> Dhis2Result<ImportSummary> {
        let url = self.api_url("dataValueSets");
        let response = self
            .authed(self.client.post(&url))
            .query(&[("importStrategy", strategy.as_str())])
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // 2.38+ answers 409 when any value conflicts, with the summary in the body
        if status.is_success() || status == StatusCode::CONFLICT {
            let parsed = serde_json::from_str(&body)
                .map_err(Dhis2Error::from)
                .and_then(ImportSummary::from_json);
            match parsed {
                Ok(summary) => return Ok(summary),
                Err(e) if status.is_success() => {
                    return Err(Dhis2Error::InvalidResponse(format!(
                        "import summary: {}",
                        e
                    )))
                }
                Err(_) => {}
            }
        }
        Err(Dhis2Error::Http { status, body })
    }
}
