//! Where hourly grids come from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use cds_client::{CacheDir, CdsClient, CdsConfig};
use era5_common::{BoundingBox, DateRange, HourlyGrid};
use netcdf_parser::read_hourly_files;
use tracing::info;

use crate::config::ImporterConfig;

/// Supplies the hourly grid covering a date range and area.
#[async_trait]
pub trait HourlySource: Send + Sync {
    async fn fetch_hourly(&self, range: &DateRange, bbox: &BoundingBox) -> Result<HourlyGrid>;
}

/// ERA5-Land from the Climate Data Store, through the on-disk cache.
pub struct CdsSource {
    client: CdsClient,
    cache: CacheDir,
    variables: Vec<String>,
    value_var: String,
}

impl CdsSource {
    pub fn new(config: &ImporterConfig) -> Result<Self> {
        let client = CdsClient::new(CdsConfig::new(&config.cds_url, &config.cds_key))
            .context("Failed to create CDS client")?;
        Ok(Self {
            client,
            cache: CacheDir::new(&config.download_folder, &config.download_prefix),
            variables: vec![config.variable.clone()],
            value_var: config.value_col.clone(),
        })
    }
}

#[async_trait]
impl HourlySource for CdsSource {
    async fn fetch_hourly(&self, range: &DateRange, bbox: &BoundingBox) -> Result<HourlyGrid> {
        let report = self
            .client
            .fetch_hourly(&self.variables, range, bbox, &self.cache)
            .await
            .context("Failed to download ERA5-Land data")?;

        info!(files = report.files.len(), "Loading data from files");

        let files = report.files;
        let value_var = self.value_var.clone();
        let grid = tokio::task::spawn_blocking(move || read_hourly_files(&files, &value_var))
            .await
            .context("NetCDF reader task failed")?
            .context("Failed to read ERA5-Land files")?;

        Ok(grid)
    }
}
