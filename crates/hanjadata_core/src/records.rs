//! The kanji record shapes produced by the pipeline stages.
//!
//! Each merge stage consumes one stage's record type and produces the next,
//! so a record never carries fields it has not earned yet. All shapes
//! serialize to the camelCase JSON the dataset artifacts use.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// School-grade ranking metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub grade: u32,
    pub grade_order: u32,
    pub kanken: Option<u32>,
}

/// The radical a kanji is classified under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Radical {
    pub id: u32,
    pub kanji: String,
    pub name: String,
}

/// An example word for a reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub word: String,
    #[serde(default)]
    pub meaning: ExampleMeaning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleMeaning {
    #[serde(default)]
    pub ko: String,
    #[serde(default)]
    pub en: String,
}

impl ExampleMeaning {
    pub fn is_empty(&self) -> bool {
        self.ko.is_empty() && self.en.is_empty()
    }
}

/// One reading of a kanji, with the example words using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub kana: String,
    #[serde(default)]
    pub romaji: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// The onyomi or kunyomi readings of a kanji.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingGroup {
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub description: Description,
}

impl ReadingGroup {
    /// Enforces the primary-reading cardinality invariant: a lone reading is
    /// always primary, and at most one reading per group may be primary
    /// (the first marked one wins).
    pub fn enforce_primary(&mut self) {
        if let [only] = self.readings.as_mut_slice() {
            only.is_primary = true;
            return;
        }
        let mut seen_primary = false;
        for reading in &mut self.readings {
            if reading.is_primary {
                if seen_primary {
                    reading.is_primary = false;
                }
                seen_primary = true;
            }
        }
    }
}

/// A reading group description, either still scraped plain text (possibly
/// empty) or already localized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Text(String),
    Localized {
        ko: String,
        #[serde(default)]
        en: String,
    },
}

impl Default for Description {
    fn default() -> Self {
        Description::Text(String::new())
    }
}

/// The visual representation of a kanji, serialized `{ "type": .., "value": .. }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum VisualData {
    Emoji(String),
    Image(String),
}

/// The scraped mnemonic for a kanji's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeDescription {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub text: LocalizedText,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub ko: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub en: String,
}

/// Kanji meanings before LLM enrichment; `en` is still a plain string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meanings {
    #[serde(default)]
    pub ko_hun: String,
    #[serde(default)]
    pub ko_eum: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ko: Vec<String>,
    #[serde(default)]
    pub en: String,
}

/// Kanji meanings after LLM enrichment; `en` is an ordered list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedMeanings {
    pub ko_hun: String,
    pub ko_eum: String,
    pub ko: Vec<String>,
    pub en: Vec<String>,
}

/// A row of the school-grade table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub kanji: String,
    pub grade: u32,
    pub grade_order: u32,
}

/// A converted (English-keyed) metadata row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaRecord {
    pub id: u32,
    pub kanji: String,
    pub kanken_level: Option<u32>,
    pub radical_id: u32,
    pub radical_kanji: String,
    pub radical_name: String,
}

/// A record after the grade merge: metadata plus grade ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedRecord {
    pub id: u32,
    pub kanji: String,
    pub level: Level,
    pub radical: Radical,
}

/// The full record after the scrape merge, before LLM enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanjiRecord {
    pub id: u32,
    pub kanji: String,
    pub level: Level,
    pub radical: Radical,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_url: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_description: Option<ShapeDescription>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meanings: Option<Meanings>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown: Option<Vec<Reading>>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onyomi: Option<ReadingGroup>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kunyomi: Option<ReadingGroup>,
}

/// The final record shape. `visualData` sits above `shapeDescription`, the
/// `unknown` readings are gone and `meanings.en` has become a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub id: u32,
    pub kanji: String,
    pub level: Level,
    pub radical: Radical,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_url: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub visual_data: VisualData,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_description: Option<ShapeDescription>,
    pub meanings: EnrichedMeanings,
    pub onyomi: ReadingGroup,
    pub kunyomi: ReadingGroup,
}

/// The exported dataset artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub version: String,
    pub data: Vec<EnrichedRecord>,
}

/// Removes examples that duplicate another example's word while carrying an
/// empty meaning. When every duplicate of a word is empty, the first one is
/// kept; otherwise only the non-empty ones survive. Order is preserved.
pub fn dedup_examples(examples: Vec<Example>) -> Vec<Example> {
    let mut has_meaning = HashSet::new();
    for example in &examples {
        if !example.meaning.is_empty() {
            has_meaning.insert(example.word.clone());
        }
    }
    let mut seen_empty = HashSet::new();
    examples
        .into_iter()
        .filter(|example| {
            if !example.meaning.is_empty() {
                return true;
            }
            if has_meaning.contains(&example.word) {
                return false;
            }
            seen_empty.insert(example.word.clone())
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn example(word: &str, ko: &str, en: &str) -> Example {
        Example {
            word: word.to_string(),
            meaning: ExampleMeaning {
                ko: ko.to_string(),
                en: en.to_string(),
            },
        }
    }

    fn reading(kana: &str, is_primary: bool) -> Reading {
        Reading {
            kana: kana.to_string(),
            romaji: String::new(),
            is_primary,
            examples: vec![],
        }
    }

    #[test]
    fn lone_reading_becomes_primary() {
        let mut group = ReadingGroup {
            readings: vec![reading("アイ", false)],
            description: Description::default(),
        };
        group.enforce_primary();
        assert!(group.readings[0].is_primary);
    }

    #[test]
    fn at_most_one_primary_survives() {
        let mut group = ReadingGroup {
            readings: vec![
                reading("アイ", true),
                reading("あわれ", true),
                reading("かな", false),
            ],
            description: Description::default(),
        };
        group.enforce_primary();
        let primaries = group.readings.iter().filter(|r| r.is_primary).count();
        assert_eq!(primaries, 1);
        assert!(group.readings[0].is_primary);
    }

    #[test]
    fn dedup_prefers_non_empty_meaning() {
        let examples = vec![example("愛国", "", ""), example("愛国", "애국", "patriotism")];
        let deduped = dedup_examples(examples);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].meaning.ko, "애국");
    }

    #[test]
    fn dedup_keeps_first_of_all_empty() {
        let examples = vec![example("哀悼", "", ""), example("哀悼", "", "")];
        let deduped = dedup_examples(examples);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn dedup_keeps_distinct_words() {
        let examples = vec![example("愛国", "애국", ""), example("愛人", "애인", "")];
        assert_eq!(dedup_examples(examples).len(), 2);
    }

    #[test]
    fn visual_data_serializes_tagged() {
        let json = serde_json::to_string(&VisualData::Emoji("❤️".to_string())).unwrap();
        assert_eq!(json, r#"{"type":"emoji","value":"❤️"}"#);
        let json = serde_json::to_string(&VisualData::Image(String::new())).unwrap();
        assert_eq!(json, r#"{"type":"image","value":""}"#);
    }

    #[test]
    fn description_accepts_both_shapes() {
        let text: Description = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(text, Description::Text(String::new()));
        let localized: Description = serde_json::from_str(r#"{"ko":"설명","en":""}"#).unwrap();
        assert_eq!(
            localized,
            Description::Localized {
                ko: "설명".to_string(),
                en: String::new()
            }
        );
    }
}
