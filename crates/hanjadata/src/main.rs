//! Builds the kanji learning dataset from its raw inputs.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use eyre::{bail, WrapErr};
use hanjadata::{
    download,
    enrich::{self, MaybeEnriched},
    input::meta::{self, MetaRecordJa},
    input::readings::DictEntry,
    input::scraped::ScrapedRecord,
    llm::GeminiClient,
    merge::{self, ReadingRecord},
    net::FixedDelay,
    scan, tts,
};
use hanjadata_core::records::{Dataset, GradeRecord, GradedRecord, KanjiRecord, MetaRecord};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::ConvertMeta { input, output } => {
            convert_meta(&input, &output)?;
        }
        Command::MergeGrade {
            meta,
            grade,
            output,
        } => {
            merge_grade(&meta, &grade, &output)?;
        }
        Command::MergeReadings {
            base,
            readings,
            output,
        } => {
            merge_readings(&base, &readings, &output)?;
        }
        Command::MergeScraped {
            base,
            scraped,
            output,
        } => {
            merge_scraped(&base, &scraped, &output)?;
        }
        Command::Enrich {
            input,
            output,
            audit_log,
            batch_size,
            model,
        } => {
            enrich(&input, &output, &audit_log, batch_size, model)?;
        }
        Command::Export {
            input,
            output,
            version,
        } => {
            export(&input, &output, version)?;
        }
        Command::DownloadImages { input, dir } => {
            download_images(&input, &dir)?;
        }
        Command::Tts { input, dir } => {
            generate_tts(&input, &dir)?;
        }
    }

    Ok(())
}

fn convert_meta(input: &Path, output: &Path) -> eyre::Result<()> {
    let records: Vec<MetaRecordJa> = read_json(input)?;
    tracing::info!("converting {} entries", records.len());
    let converted = meta::convert(records);
    write_json(output, &converted)?;

    tracing::info!("checking for corrupted characters");
    let document = serde_json::to_value(&converted)?;
    let corruptions = scan::find_replacement_chars(&document);
    if !corruptions.is_empty() {
        for corruption in corruptions.iter().take(10) {
            tracing::error!(
                "corrupted value at {}: {:?} (positions {:?})",
                corruption.path,
                corruption.value,
                corruption.positions
            );
        }
        if corruptions.len() > 10 {
            tracing::error!("... and {} more corrupted value(s)", corruptions.len() - 10);
        }
        bail!(
            "Found {} corrupted value(s) in the converted output",
            corruptions.len()
        );
    }
    Ok(())
}

fn merge_grade(meta: &Path, grade: &Path, output: &Path) -> eyre::Result<()> {
    let meta: Vec<MetaRecord> = read_json(meta)?;
    let grades: Vec<GradeRecord> = read_json(grade)?;

    tracing::info!("merging grades into {} records", meta.len());
    let base_kanji = meta.iter().map(|r| r.kanji.clone()).collect::<Vec<_>>();
    let merged = merge::merge_grade(meta, &grades);
    merge::validate_coverage(
        base_kanji.iter().map(String::as_str),
        merged.iter().map(|r| r.kanji.as_str()),
    )?;
    write_json(output, &merged)
}

fn merge_readings(base: &Path, readings: &Path, output: &Path) -> eyre::Result<()> {
    let base: Vec<GradedRecord> = read_json(base)?;
    let dict: Vec<DictEntry> = read_json(readings)?;

    tracing::info!(
        "merging {} dictionary entries into {} records",
        dict.len(),
        base.len()
    );
    let base_kanji = base.iter().map(|r| r.kanji.clone()).collect::<Vec<_>>();
    let merged = merge::merge_readings(base, dict);
    merge::validate_coverage(
        base_kanji.iter().map(String::as_str),
        merged.iter().map(|r| r.kanji.as_str()),
    )?;
    write_json(output, &merged)
}

fn merge_scraped(base: &Path, scraped: &Path, output: &Path) -> eyre::Result<()> {
    let base: Vec<ReadingRecord> = read_json(base)?;
    let scraped: Vec<ScrapedRecord> = read_json(scraped)?;

    tracing::info!(
        "merging {} scraped pages into {} records",
        scraped.len(),
        base.len()
    );
    let base_kanji = base.iter().map(|r| r.kanji.clone()).collect::<Vec<_>>();
    let merged = merge::merge_scraped(base, &scraped);
    merge::validate_coverage(
        base_kanji.iter().map(String::as_str),
        merged.iter().map(|r| r.kanji.as_str()),
    )?;
    write_json(output, &merged)
}

fn enrich(
    input: &Path,
    output: &Path,
    audit_log: &Path,
    batch_size: usize,
    model: String,
) -> eyre::Result<()> {
    let records: Vec<KanjiRecord> = read_json(input)?;
    tracing::info!("enriching {} records in batches of {batch_size}", records.len());

    let client = GeminiClient::from_env(model)?;
    let mut limiter = FixedDelay::per_second();
    let mut audit_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_log)
        .wrap_err_with(|| format!("Failed to open audit log at '{}'", audit_log.display()))?;

    let (results, stats) = enrich::enrich_records(
        &client,
        records,
        batch_size,
        &mut limiter,
        |batch_index, raw| {
            if batch_index > 0 {
                audit_file.write_all(b"\n")?;
            }
            audit_file.write_all(raw.as_bytes())?;
            Ok(())
        },
        |results| write_json(output, results),
    )?;

    write_json(output, &results)?;
    tracing::info!(
        "enriched {} records, {} failed batch(es)",
        stats.enriched,
        stats.failed_batches
    );
    Ok(())
}

fn export(input: &Path, output: &Path, version: String) -> eyre::Result<()> {
    let records: Vec<MaybeEnriched> = read_json(input)?;

    let mut data = Vec::with_capacity(records.len());
    let mut pending = Vec::new();
    for record in records {
        match record {
            MaybeEnriched::Enriched(record) => data.push(*record),
            MaybeEnriched::Pending(record) => pending.push(record.kanji),
        }
    }
    if !pending.is_empty() {
        bail!(
            "{} record(s) are not enriched yet, starting with: {}",
            pending.len(),
            pending
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    tracing::info!("exporting {} records as version {version}", data.len());
    write_json(output, &Dataset { version, data })
}

fn download_images(input: &Path, dir: &Path) -> eyre::Result<()> {
    let records: Vec<KanjiRecord> = read_json(input)?;

    let client = reqwest::blocking::Client::new();
    let mut limiter = FixedDelay::per_second();
    let stats = download::download_images(&client, &records, dir, &mut limiter)?;
    tracing::info!(
        "downloaded {}, skipped {}, failed {}",
        stats.downloaded,
        stats.skipped,
        stats.failed
    );
    Ok(())
}

fn generate_tts(input: &Path, dir: &Path) -> eyre::Result<()> {
    let records: Vec<MaybeEnriched> = read_json(input)?;
    let (enriched, pending): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| matches!(record, MaybeEnriched::Enriched(_)));
    if !pending.is_empty() {
        tracing::warn!("skipping {} record(s) that are not enriched yet", pending.len());
    }
    let enriched = enriched
        .into_iter()
        .filter_map(|record| match record {
            MaybeEnriched::Enriched(record) => Some(*record),
            MaybeEnriched::Pending(_) => None,
        })
        .collect::<Vec<_>>();

    let provider = tts::TtsProvider::from_env()?;
    let client = reqwest::blocking::Client::new();
    let mut limiter = FixedDelay::per_second();
    let stats = tts::generate_audio(&provider, &client, &enriched, dir, &mut limiter)?;
    tracing::info!(
        "generated {}, skipped {}, failed {}",
        stats.generated,
        stats.skipped,
        stats.failed
    );
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open file at '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("Failed to deserialize '{}'", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> eyre::Result<()> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create file at '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .wrap_err_with(|| format!("Failed to serialize '{}'", path.display()))?;
    Ok(())
}
