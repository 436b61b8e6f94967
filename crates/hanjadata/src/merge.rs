//! Key-based left joins over the kanji artifacts.
//!
//! Every merge keeps one output record per base record; a lookup miss leaves
//! the fields the lookup would have supplied defaulted. Each stage's output
//! must pass `validate_coverage` before it is written: a silently dropped
//! kanji corrupts the downstream learning content, so a missing key is fatal.

use crate::{
    input::{
        readings::{DictEntry, DictReading},
        scraped::{ReadingDetail, ScrapedRecord},
    },
    reconcile,
};
use hanjadata_core::records::{
    dedup_examples, Description, Example, ExampleMeaning, GradeRecord, GradedRecord, KanjiRecord,
    Level, LocalizedText, Meanings, MetaRecord, Radical, Reading, ReadingGroup, ShapeDescription,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use wana_kana::ConvertJapanese;

/// Scraped descriptions that only say "there is nothing to say" are dropped.
const EMPTY_ONYOMI_PATTERNS: &[&str] = &["정식 음독은 없습니다.", "특별한 점은 없습니다."];
const EMPTY_KUNYOMI_PATTERNS: &[&str] = &["정식 훈독은 없습니다.", "특별한 점은 없습니다."];

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("{} kanji missing from merged output: {}", .0.len(), .0.iter().join(", "))]
    MissingKanji(Vec<String>),
}

/// Checks that every base kanji survived the merge.
pub fn validate_coverage<'a>(
    base: impl IntoIterator<Item = &'a str>,
    output: impl IntoIterator<Item = &'a str>,
) -> Result<(), MergeError> {
    let output = output.into_iter().collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let missing = base
        .into_iter()
        .filter(|kanji| !output.contains(kanji) && seen.insert(*kanji))
        .map(String::from)
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MergeError::MissingKanji(missing))
    }
}

/// Joins the metadata table with the grade table.
///
/// Graded kanji take the grade table's `gradeOrder` verbatim; ungraded
/// (grade 0) kanji are numbered 0, 1, 2, … in base order so they keep a
/// stable ordering of their own.
pub fn merge_grade(meta: Vec<MetaRecord>, grades: &[GradeRecord]) -> Vec<GradedRecord> {
    let grade_map = grades
        .iter()
        .map(|grade| (grade.kanji.as_str(), (grade.grade, grade.grade_order)))
        .collect::<HashMap<_, _>>();

    // accumulator for ungraded kanji, scoped to this merge
    let mut grade_zero_order = 0;
    meta.into_iter()
        .map(|item| {
            let (grade, lookup_order) = grade_map
                .get(item.kanji.as_str())
                .copied()
                .unwrap_or((0, 0));
            let grade_order = if grade != 0 {
                lookup_order
            } else {
                let order = grade_zero_order;
                grade_zero_order += 1;
                order
            };
            GradedRecord {
                id: item.id,
                kanji: item.kanji,
                level: Level {
                    grade,
                    grade_order,
                    kanken: item.kanken_level,
                },
                radical: Radical {
                    id: item.radical_id,
                    kanji: item.radical_kanji,
                    name: item.radical_name,
                },
            }
        })
        .collect()
}

/// A record between the reading merge and the scrape merge: graded metadata
/// plus the raw dictionary readings, still in their dictionary shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: u32,
    pub kanji: String,
    pub level: Level,
    pub radical: Radical,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readings: Option<Vec<DictReading>>,
}

/// Joins the graded records with the dictionary reading table. A dictionary
/// entry may cover several kanji; each gets the entry's readings.
pub fn merge_readings(base: Vec<GradedRecord>, dict: Vec<DictEntry>) -> Vec<ReadingRecord> {
    let mut reading_map = HashMap::new();
    for entry in &dict {
        for kanji in &entry.kanji {
            reading_map.insert(kanji.as_str(), &entry.readings);
        }
    }

    base.into_iter()
        .map(|item| {
            let readings = reading_map.get(item.kanji.as_str()).map(|r| (*r).clone());
            ReadingRecord {
                id: item.id,
                kanji: item.kanji,
                level: item.level,
                radical: item.radical,
                readings,
            }
        })
        .collect()
}

/// Joins the reading records with the scraped site records, producing the
/// full pre-enrichment record shape.
///
/// The scraped basic info becomes the onyomi/kunyomi reading groups and the
/// raw dictionary readings become `unknown` entries, which the reconciler
/// then resolves against the groups. Records without a scraped counterpart
/// keep their dictionary readings as `unknown` and nothing else.
pub fn merge_scraped(base: Vec<ReadingRecord>, scraped: &[ScrapedRecord]) -> Vec<KanjiRecord> {
    let scrape_map = scraped
        .iter()
        .map(|item| (item.kanji.as_str(), item))
        .collect::<HashMap<_, _>>();

    base.into_iter()
        .map(|item| {
            let scrape = scrape_map.get(item.kanji.as_str()).copied();
            let mut record = merge_scraped_record(item, scrape);
            finalize_record(&mut record);
            record
        })
        .collect()
}

fn merge_scraped_record(item: ReadingRecord, scrape: Option<&ScrapedRecord>) -> KanjiRecord {
    let unknown = item.readings.map(dict_readings_to_unknown);
    let mut record = KanjiRecord {
        id: item.id,
        kanji: item.kanji,
        level: item.level,
        radical: item.radical,
        ref_url: None,
        image: None,
        shape_description: None,
        meanings: None,
        unknown,
        onyomi: None,
        kunyomi: None,
    };
    let Some(scrape) = scrape else {
        return record;
    };

    if !scrape.url.is_empty() {
        record.ref_url = Some(scrape.url.clone());
    }
    if !scrape.image.is_empty() {
        record.image = Some(scrape.image.clone());
    }
    record.shape_description = Some(ShapeDescription {
        image: scrape.shape_description.image.clone(),
        text: LocalizedText {
            ko: scrape.shape_description.text.clone(),
            en: String::new(),
        },
    });
    record.meanings = Some(meanings_from_scrape(&scrape.basic_info.meaning));
    record.onyomi = Some(group_from_scrape(
        &scrape.basic_info.onyomi,
        &scrape.onyomi_detail,
        EMPTY_ONYOMI_PATTERNS,
    ));
    record.kunyomi = Some(group_from_scrape(
        &scrape.basic_info.kunyomi,
        &scrape.kunyomi_detail,
        EMPTY_KUNYOMI_PATTERNS,
    ));
    record
}

/// The first scraped meaning line is the Korean hun/eum pair separated by the
/// last space ("슬플 애"); any further lines are plain senses.
fn meanings_from_scrape(meaning: &[String]) -> Meanings {
    let mut meanings = Meanings::default();
    if let Some(first) = meaning.first() {
        match first.rsplit_once(' ') {
            Some((hun, eum)) => {
                meanings.ko_hun = hun.to_string();
                meanings.ko_eum = eum.to_string();
            }
            None => meanings.ko_hun = first.clone(),
        }
        meanings.ko = meaning[1..].to_vec();
    }
    meanings
}

fn group_from_scrape(
    kana_list: &[String],
    detail: &ReadingDetail,
    empty_patterns: &[&str],
) -> ReadingGroup {
    let words_map = build_words_map(detail);
    let readings = kana_list
        .iter()
        .map(|kana| Reading {
            kana: kana.clone(),
            romaji: String::new(),
            is_primary: false,
            examples: words_map.get(kana.as_str()).cloned().unwrap_or_default(),
        })
        .collect();
    ReadingGroup {
        readings,
        description: process_description(&detail.description, empty_patterns),
    }
}

/// Collects the detail section's representative words and example sentences
/// into one list per reading kana.
fn build_words_map(detail: &ReadingDetail) -> HashMap<&str, Vec<Example>> {
    let mut words_map: HashMap<&str, Vec<Example>> = HashMap::new();
    for list in detail.representative_words.iter().chain(&detail.examples) {
        let examples = list.words.iter().map(|word| Example {
            word: word.word.clone(),
            meaning: ExampleMeaning {
                ko: word.meaning.clone(),
                en: String::new(),
            },
        });
        words_map.entry(&list.reading).or_default().extend(examples);
    }
    words_map
}

fn process_description(description: &str, empty_patterns: &[&str]) -> Description {
    if empty_patterns.iter().any(|p| description.contains(p)) {
        return Description::Text(String::new());
    }
    Description::Localized {
        ko: description.to_string(),
        en: String::new(),
    }
}

fn dict_readings_to_unknown(readings: Vec<DictReading>) -> Vec<Reading> {
    readings
        .into_iter()
        .map(|reading| Reading {
            kana: reading.reading,
            romaji: String::new(),
            is_primary: false,
            examples: reading
                .examples
                .into_iter()
                .map(|example| example.normalize())
                .collect(),
        })
        .collect()
}

/// Post-merge pass: romaji, primary flags, example cleanup, and unknown
/// resolution.
fn finalize_record(record: &mut KanjiRecord) {
    if let Some(group) = record.onyomi.as_mut() {
        process_group(group);
    }
    if let Some(group) = record.kunyomi.as_mut() {
        process_group(group);
    }
    if let Some(unknown) = record.unknown.take() {
        let mut no_onyomi = ReadingGroup::default();
        let mut no_kunyomi = ReadingGroup::default();
        let onyomi = record.onyomi.as_mut().unwrap_or(&mut no_onyomi);
        let kunyomi = record.kunyomi.as_mut().unwrap_or(&mut no_kunyomi);
        record.unknown = reconcile::resolve_unknown(onyomi, kunyomi, unknown);
    }
}

fn process_group(group: &mut ReadingGroup) {
    group.enforce_primary();
    for reading in &mut group.readings {
        reading.romaji = reading.kana.to_romaji();
        for example in &mut reading.examples {
            example.word = strip_ruby(&example.word);
        }
        reading.examples = dedup_examples(std::mem::take(&mut reading.examples));
    }
}

/// Strips `<ruby>X<rt>..</rt></ruby>` annotations down to `X`. Malformed
/// tags are left verbatim.
pub fn strip_ruby(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<ruby>") {
        out.push_str(&rest[..start]);
        let after = &rest[start + "<ruby>".len()..];
        let stripped = after.find("<rt>").and_then(|rt_start| {
            let end = after[rt_start..].find("</ruby>")?;
            Some((&after[..rt_start], &after[rt_start + end + "</ruby>".len()..]))
        });
        match stripped {
            Some((base, remainder)) => {
                out.push_str(base);
                rest = remainder;
            }
            None => {
                out.push_str("<ruby>");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::scraped::{BasicInfo, ScrapedShape, ScrapedWord, WordList};

    fn meta(id: u32, kanji: &str) -> MetaRecord {
        MetaRecord {
            id,
            kanji: kanji.to_string(),
            kanken_level: None,
            radical_id: 1,
            radical_kanji: "口".to_string(),
            radical_name: "くち".to_string(),
        }
    }

    fn scraped(kanji: &str) -> ScrapedRecord {
        ScrapedRecord {
            kanji: kanji.to_string(),
            level: Some(5),
            url: format!("https://example.com/{kanji}"),
            image: String::new(),
            basic_info: BasicInfo {
                meaning: vec!["슬플 애".to_string(), "애달플".to_string()],
                onyomi: vec!["アイ".to_string()],
                kunyomi: vec!["あわれ".to_string(), "あわれむ".to_string()],
            },
            shape_description: ScrapedShape {
                image: String::new(),
                text: "사람이 우는 모양".to_string(),
            },
            onyomi_detail: ReadingDetail {
                description: "일반적인 음독입니다.".to_string(),
                representative_words: vec![WordList {
                    reading: "アイ".to_string(),
                    words: vec![ScrapedWord {
                        word: "哀悼".to_string(),
                        meaning: "애도".to_string(),
                    }],
                }],
                examples: vec![WordList {
                    reading: "アイ".to_string(),
                    words: vec![ScrapedWord {
                        word: "<ruby>哀愁<rt>あいしゅう</rt></ruby>".to_string(),
                        meaning: "애수".to_string(),
                    }],
                }],
            },
            kunyomi_detail: ReadingDetail {
                description: "정식 훈독은 없습니다.".to_string(),
                representative_words: vec![],
                examples: vec![],
            },
        }
    }

    #[test]
    fn grade_zero_records_are_numbered_in_base_order() {
        let meta_rows = vec![meta(1, "甲"), meta(2, "乙"), meta(3, "丙")];
        let merged = merge_grade(meta_rows, &[]);
        let orders = merged
            .iter()
            .map(|r| r.level.grade_order)
            .collect::<Vec<_>>();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(merged.iter().all(|r| r.level.grade == 0));
    }

    #[test]
    fn graded_records_take_lookup_order_verbatim() {
        let grades = vec![GradeRecord {
            kanji: "愛".to_string(),
            grade: 4,
            grade_order: 17,
        }];
        let merged = merge_grade(vec![meta(1, "愛"), meta(2, "甲")], &grades);
        assert_eq!(merged[0].level.grade, 4);
        assert_eq!(merged[0].level.grade_order, 17);
        // the ungraded record still counts from 0
        assert_eq!(merged[1].level.grade_order, 0);
    }

    #[test]
    fn merges_never_drop_base_records() {
        let base = merge_grade(vec![meta(1, "愛"), meta(2, "謎")], &[]);
        let with_readings = merge_readings(base, vec![]);
        assert_eq!(with_readings.len(), 2);
        let merged = merge_scraped(with_readings, &[scraped("愛")]);
        assert_eq!(merged.len(), 2);
        // the record absent from the lookup keeps defaulted fields
        let missing = merged.iter().find(|r| r.kanji == "謎").unwrap();
        assert!(missing.onyomi.is_none());
        assert!(missing.meanings.is_none());

        validate_coverage(
            ["愛", "謎"],
            merged.iter().map(|r| r.kanji.as_str()),
        )
        .unwrap();
    }

    #[test]
    fn coverage_check_reports_missing_kanji() {
        let err = validate_coverage(["愛", "哀", "愛"], ["愛"]).unwrap_err();
        let MergeError::MissingKanji(missing) = err;
        assert_eq!(missing, vec!["哀".to_string()]);
    }

    #[test]
    fn scrape_merge_builds_reading_groups() {
        let base = merge_readings(merge_grade(vec![meta(2, "哀")], &[]), vec![]);
        let merged = merge_scraped(base, &[scraped("哀")]);
        let record = &merged[0];

        let meanings = record.meanings.as_ref().unwrap();
        assert_eq!(meanings.ko_hun, "슬플");
        assert_eq!(meanings.ko_eum, "애");
        assert_eq!(meanings.ko, vec!["애달플".to_string()]);

        let onyomi = record.onyomi.as_ref().unwrap();
        assert_eq!(onyomi.readings.len(), 1);
        let reading = &onyomi.readings[0];
        // a lone reading is primary and gets its romaji derived
        assert!(reading.is_primary);
        assert_eq!(reading.romaji, "ai");
        // representative words and examples merge, ruby tags stripped
        let words = reading
            .examples
            .iter()
            .map(|e| e.word.as_str())
            .collect::<Vec<_>>();
        assert_eq!(words, vec!["哀悼", "哀愁"]);

        // the "nothing to say" kunyomi description is emptied
        let kunyomi = record.kunyomi.as_ref().unwrap();
        assert_eq!(kunyomi.description, Description::Text(String::new()));
        assert!(!kunyomi.readings[0].is_primary);
    }

    #[test]
    fn dictionary_readings_become_unknown_when_unmatched() {
        let base = vec![ReadingRecord {
            id: 9,
            kanji: "謎".to_string(),
            level: Level {
                grade: 0,
                grade_order: 0,
                kanken: None,
            },
            radical: Radical {
                id: 1,
                kanji: "言".to_string(),
                name: "말씀".to_string(),
            },
            readings: Some(vec![DictReading {
                reading: "なぞ".to_string(),
                examples: vec![],
            }]),
        }];
        let merged = merge_scraped(base, &[]);
        let unknown = merged[0].unknown.as_ref().unwrap();
        assert_eq!(unknown[0].kana, "なぞ");
        assert!(merged[0].onyomi.is_none());
    }

    #[test]
    fn unknown_resolves_into_scraped_group() {
        let mut base = merge_readings(merge_grade(vec![meta(2, "哀")], &[]), vec![]);
        base[0].readings = Some(vec![DictReading {
            reading: "あわ(れ)".to_string(),
            examples: vec![crate::input::readings::DictExample::Word("哀れ".to_string())],
        }]);
        let merged = merge_scraped(base, &[scraped("哀")]);
        let record = &merged[0];
        assert!(record.unknown.is_none());
        let kunyomi = record.kunyomi.as_ref().unwrap();
        let awar = kunyomi.readings.iter().find(|r| r.kana == "あわれ").unwrap();
        assert_eq!(awar.examples[0].word, "哀れ");
    }

    #[test]
    fn strips_ruby_annotations() {
        assert_eq!(strip_ruby("<ruby>哀愁<rt>あいしゅう</rt></ruby>"), "哀愁");
        assert_eq!(
            strip_ruby("前<ruby>哀<rt>あい</rt></ruby>後<ruby>愁<rt>しゅう</rt></ruby>"),
            "前哀後愁"
        );
        assert_eq!(strip_ruby("哀愁"), "哀愁");
        assert_eq!(strip_ruby("<ruby>哀愁"), "<ruby>哀愁");
    }
}
