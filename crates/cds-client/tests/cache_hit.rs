//! A fully cached range is served from disk without contacting CDS.

use chrono::NaiveDate;
use cds_client::{CacheDir, CdsClient, CdsConfig};
use era5_common::{BoundingBox, DateRange};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// Nothing listens on the discard port, so any request would fail.
fn offline_client() -> CdsClient {
    let mut config = CdsConfig::new("http://127.0.0.1:9/api", "not-a-key");
    config.max_retries = 0;
    CdsClient::new(config).unwrap()
}

#[tokio::test]
async fn test_cached_chunks_skip_requests() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CacheDir::new(tmp.path(), "era5_hourly");
    let range = DateRange::new(d(2025, 1, 20), d(2025, 2, 10)).unwrap();

    for chunk in range.monthly_chunks() {
        std::fs::write(cache.path_for(&chunk), b"CDF\x01").unwrap();
    }

    let report = offline_client()
        .fetch_hourly(
            &["total_precipitation".to_string()],
            &range,
            &BoundingBox::new(36.0, -1.0, 37.0, 0.0),
            &cache,
        )
        .await
        .unwrap();

    assert_eq!(report.downloaded, 0);
    assert_eq!(report.cached, 2);
    assert_eq!(
        report.files,
        vec![
            tmp.path().join("era5_hourly_20250120_20250131.nc"),
            tmp.path().join("era5_hourly_20250201_20250210.nc"),
        ]
    );
}

#[tokio::test]
async fn test_missing_chunk_goes_to_network() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = CacheDir::new(tmp.path().join("nested"), "era5_hourly");
    let range = DateRange::new(d(2025, 1, 1), d(2025, 1, 2)).unwrap();

    let result = offline_client()
        .fetch_hourly(
            &["total_precipitation".to_string()],
            &range,
            &BoundingBox::new(36.0, -1.0, 37.0, 0.0),
            &cache,
        )
        .await;

    assert!(result.is_err());
    // cache directory is created even when the download fails
    assert!(tmp.path().join("nested").is_dir());
    assert!(!cache.path_for(&range).exists());
}
