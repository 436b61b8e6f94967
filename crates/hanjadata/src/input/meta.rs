//! Models and converts the Japanese-keyed kanji metadata table.

use hanjadata_core::records::MetaRecord;
use serde::{Deserialize, Serialize};

/// A raw metadata row as exported from the source spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaRecordJa {
    #[serde(rename = "識別番号")]
    pub id: u32,
    #[serde(rename = "漢字")]
    pub kanji: String,
    #[serde(rename = "漢検級")]
    pub kanken_level: Option<String>,
    #[serde(rename = "部首ID")]
    pub radical_id: u32,
    #[serde(rename = "部首")]
    pub radical_kanji: String,
    #[serde(rename = "部首名")]
    pub radical_name: String,
}

pub fn convert(records: Vec<MetaRecordJa>) -> Vec<MetaRecord> {
    records
        .into_iter()
        .map(|record| MetaRecord {
            id: record.id,
            kanji: record.kanji,
            kanken_level: record.kanken_level.as_deref().and_then(convert_kanken_level),
            radical_id: record.radical_id,
            radical_kanji: record.radical_kanji,
            radical_name: record.radical_name,
        })
        .collect()
}

/// Converts a Kanken grade label to its numeric rank.
///
/// 準2級 ranks above 2級, so the two map to 2 and 1 respectively; every other
/// n級 keeps its number. Unrecognized labels convert to `None`.
pub fn convert_kanken_level(label: &str) -> Option<u32> {
    if label == "準2級" {
        return Some(2);
    }
    let digits = label.strip_suffix("級")?;
    let level: u32 = digits.parse().ok()?;
    if level == 2 {
        Some(1)
    } else {
        Some(level)
    }
}
