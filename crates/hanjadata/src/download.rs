//! Downloads the scraped stroke-order images referenced by the records.
//!
//! Files already on disk are skipped, so the loop can be re-run after a
//! partial failure without re-fetching anything.

use crate::net::FixedDelay;
use eyre::WrapErr;
use hanjadata_core::records::KanjiRecord;
use std::{fs, path::Path};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetches every record's image into `dir` as `<id>_<kanji>.png`.
/// Individual failures are logged and counted, never fatal.
pub fn download_images(
    client: &reqwest::blocking::Client,
    records: &[KanjiRecord],
    dir: &Path,
    limiter: &mut FixedDelay,
) -> eyre::Result<DownloadStats> {
    fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;

    let mut stats = DownloadStats::default();
    for record in records {
        let Some(url) = record.image.as_deref().filter(|url| !url.is_empty()) else {
            continue;
        };
        let target = dir.join(image_file_name(record));
        if target.exists() {
            stats.skipped += 1;
            continue;
        }

        limiter.pause();
        match fetch(client, url) {
            Ok(bytes) => {
                fs::write(&target, bytes)
                    .wrap_err_with(|| format!("Failed to write {}", target.display()))?;
                tracing::info!("downloaded {}", target.display());
                stats.downloaded += 1;
            }
            Err(error) => {
                tracing::warn!("failed to download image for {}: {error:#}", record.kanji);
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}

pub fn image_file_name(record: &KanjiRecord) -> String {
    format!("{}_{}.png", record.id, record.kanji)
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> eyre::Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .wrap_err_with(|| format!("Failed to fetch {url}"))?
        .error_for_status()
        .wrap_err_with(|| format!("Error response from {url}"))?;
    let bytes = response
        .bytes()
        .wrap_err_with(|| format!("Failed to read response body from {url}"))?;
    Ok(bytes.to_vec())
}
