//! Models the records produced by the kanji site scraper.

use serde::{Deserialize, Serialize};

/// One scraped kanji page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedRecord {
    #[serde(default)]
    pub kanji: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub basic_info: BasicInfo,
    #[serde(default)]
    pub shape_description: ScrapedShape,
    #[serde(default)]
    pub onyomi_detail: ReadingDetail,
    #[serde(default)]
    pub kunyomi_detail: ReadingDetail,
}

/// The summary table at the top of a kanji page. `meaning` holds the Korean
/// hun/eum line first, then any further senses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub meaning: Vec<String>,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default)]
    pub kunyomi: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedShape {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub text: String,
}

/// The "reading detail" section for onyomi or kunyomi.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDetail {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub representative_words: Vec<WordList>,
    #[serde(default)]
    pub examples: Vec<WordList>,
}

/// Words grouped under one reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordList {
    pub reading: String,
    #[serde(default)]
    pub words: Vec<ScrapedWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedWord {
    pub word: String,
    #[serde(default)]
    pub meaning: String,
}
