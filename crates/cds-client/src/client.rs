//! CDS retrieve API client.
//!
//! A retrieval is an asynchronous job:
//!
//! ```text
//! POST {url}/retrieve/v1/processes/{dataset}/execution   -> jobID
//! GET  {url}/retrieve/v1/jobs/{jobID}                     -> status (poll)
//! GET  {url}/retrieve/v1/jobs/{jobID}/results             -> asset.value.href
//! GET  href                                               -> NetCDF bytes
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use era5_common::{BoundingBox, DateRange};
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheDir;
use crate::error::{CdsError, CdsResult};
use crate::request::{area_for, Era5LandRequest, DATASET};

/// Client settings. Defaults match what CDS tolerates for a single user.
#[derive(Debug, Clone)]
pub struct CdsConfig {
    /// API root, e.g. `https://cds.climate.copernicus.eu/api`
    pub url: String,
    /// Personal access token, sent as `PRIVATE-TOKEN`
    pub key: String,
    /// First delay between job status polls (doubles each poll)
    pub poll_initial_delay: Duration,
    /// Maximum delay between job status polls
    pub poll_max_delay: Duration,
    /// Give up on a job that is still queued or running after this long
    pub job_timeout: Duration,
    /// Maximum retry attempts for transient HTTP failures
    pub max_retries: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// HTTP request timeout, covering the whole body of a download
    pub request_timeout: Duration,
}

impl CdsConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            poll_initial_delay: Duration::from_secs(1),
            poll_max_delay: Duration::from_secs(30),
            job_timeout: Duration::from_secs(6 * 3600),
            max_retries: 5,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(120),
            request_timeout: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: JobState,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

/// Outcome of fetching a date range: files in chronological order.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub files: Vec<PathBuf>,
    pub downloaded: usize,
    pub cached: usize,
}

pub struct CdsClient {
    client: Client,
    config: CdsConfig,
}

impl CdsClient {
    pub fn new(config: CdsConfig) -> CdsResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self { client, config })
    }

    /// Make sure every month of `range` over `bbox` is on disk.
    ///
    /// Chunks already in the cache are reused without contacting CDS.
    #[instrument(skip(self, variables, range, cache), fields(range = %range))]
    pub async fn fetch_hourly(
        &self,
        variables: &[String],
        range: &DateRange,
        bbox: &BoundingBox,
        cache: &CacheDir,
    ) -> CdsResult<FetchReport> {
        cache.ensure_dir().await?;

        let area = area_for(bbox);
        let requests = Era5LandRequest::monthly(variables, range, area);
        let mut report = FetchReport::default();

        info!(
            chunks = requests.len(),
            area = ?area.to_cds_area(),
            dir = %cache.dir().display(),
            "Fetching ERA5-Land hourly data"
        );

        for request in &requests {
            if let Some(path) = cache.lookup(&request.range).await {
                debug!(path = %path.display(), "Using cached file");
                metrics::counter!("cds_files_cached_total").increment(1);
                report.cached += 1;
                report.files.push(path);
                continue;
            }

            let path = self.retrieve(request, cache).await?;
            metrics::counter!("cds_files_downloaded_total").increment(1);
            report.downloaded += 1;
            report.files.push(path);
        }

        info!(
            downloaded = report.downloaded,
            cached = report.cached,
            "ERA5-Land data ready"
        );
        Ok(report)
    }

    /// Run one retrieval job and download its result into the cache.
    #[instrument(skip(self, request, cache), fields(range = %request.range))]
    pub async fn retrieve(&self, request: &Era5LandRequest, cache: &CacheDir) -> CdsResult<PathBuf> {
        let job_id = self.with_retry("submit", || self.submit(request)).await?;
        info!(job_id = %job_id, "Submitted CDS job");

        self.wait_for_job(&job_id).await?;

        let href = self
            .with_retry("results", || self.result_href(&job_id))
            .await?;

        let partial = cache.partial_path_for(&request.range);
        let final_path = cache.path_for(&request.range);
        let bytes = self
            .with_retry("download", || self.download_to(&href, &partial))
            .await?;
        fs::rename(&partial, &final_path).await?;

        info!(path = %final_path.display(), bytes, "Download completed");
        Ok(final_path)
    }

    async fn submit(&self, request: &Era5LandRequest) -> CdsResult<String> {
        let url = format!(
            "{}/retrieve/v1/processes/{}/execution",
            self.base(),
            DATASET
        );
        let response = self
            .client
            .post(&url)
            .header("PRIVATE-TOKEN", &self.config.key)
            .json(&request.execution_body())
            .send()
            .await?;
        let status: JobStatus = check(response).await?.json().await?;
        Ok(status.job_id)
    }

    async fn job_status(&self, job_id: &str) -> CdsResult<JobState> {
        let url = format!("{}/retrieve/v1/jobs/{}", self.base(), job_id);
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.config.key)
            .send()
            .await?;
        let status: JobStatus = check(response).await?.json().await?;
        Ok(status.status)
    }

    /// Poll until the job succeeds, fails, or times out.
    async fn wait_for_job(&self, job_id: &str) -> CdsResult<()> {
        let started = Instant::now();
        let mut delay = self.config.poll_initial_delay;
        let mut last = None;

        loop {
            let state = self
                .with_retry("status", || self.job_status(job_id))
                .await?;

            if last != Some(state) {
                debug!(job_id, state = ?state, "Job state");
                last = Some(state);
            }

            match state {
                JobState::Successful => return Ok(()),
                JobState::Failed | JobState::Dismissed => {
                    let message = self.failure_message(job_id).await;
                    return Err(CdsError::JobFailed {
                        job_id: job_id.to_string(),
                        status: format!("{:?}", state).to_lowercase(),
                        message,
                    });
                }
                JobState::Accepted | JobState::Running | JobState::Unknown => {}
            }

            if started.elapsed() >= self.config.job_timeout {
                return Err(CdsError::Timeout {
                    job_id: job_id.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(delay).await;
            delay = std::cmp::min(delay * 2, self.config.poll_max_delay);
        }
    }

    /// Best-effort error text from a failed job's results endpoint.
    async fn failure_message(&self, job_id: &str) -> String {
        let url = format!("{}/retrieve/v1/jobs/{}/results", self.base(), job_id);
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.config.key)
            .send()
            .await;
        match response {
            Ok(r) => r.text().await.unwrap_or_default(),
            Err(e) => e.to_string(),
        }
    }

    async fn result_href(&self, job_id: &str) -> CdsResult<String> {
        let url = format!("{}/retrieve/v1/jobs/{}/results", self.base(), job_id);
        let response = self
            .client
            .get(&url)
            .header("PRIVATE-TOKEN", &self.config.key)
            .send()
            .await?;
        let results: JobResults = check(response).await?.json().await?;
        if results.asset.value.href.is_empty() {
            return Err(CdsError::InvalidResponse(format!(
                "job {} has no result href",
                job_id
            )));
        }
        Ok(results.asset.value.href)
    }

    /// Stream `href` to `path`, replacing anything already there.
    async fn download_to(&self, href: &str, path: &Path) -> CdsResult<u64> {
        let response = check(self.client.get(href).send().await?).await?;

        let mut file = File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        if written == 0 {
            return Err(CdsError::InvalidResponse(format!("empty download from {}", href)));
        }
        Ok(written)
    }

    /// Run `op`, retrying transient failures with exponential backoff.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> CdsResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CdsResult<T>>,
    {
        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry_count < self.config.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        operation = what,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_secs = delay.as_secs(),
                        "CDS request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn base(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }
}

/// Turn a non-2xx response into [`CdsError::Http`].
async fn check(response: Response) -> CdsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CdsError::Http { status, body })
}
