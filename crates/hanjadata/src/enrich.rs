//! LLM enrichment: batching, the enrichment prompt, and folding the decoded
//! response back into the original records.
//!
//! Conflict resolution favors the original data: LLM values only fill fields
//! the pipeline could not fill itself. Batches are sent strictly one at a
//! time; a failed batch is logged and skipped, leaving its records exactly as
//! the previous stage wrote them, so the stage can be re-run.

use crate::{
    codec::{self, CompactReading, CompactRecord},
    llm::GeminiClient,
    net::FixedDelay,
};
use hanjadata_core::records::{
    EnrichedMeanings, EnrichedRecord, Example, KanjiRecord, Reading, ReadingGroup, VisualData,
};
use serde::{Deserialize, Serialize};

/// The fixed part of the enrichment prompt. The compressed batch lines are
/// appended below it, keeping the cacheable prefix stable across calls.
pub const PROMPT_TEMPLATE: &str = r#"# Role
You are a Japanese Kanji Data Processor. Your task is to enrich and format Japanese kanji data into a specific compressed pipe-delimited format.

# Task Logic (Process each line step-by-step)
1. **Enrich Kanji Meanings (Korean & English)**:
   - Fill in any empty meaning fields for the Kanji.
   - **ko_hun**: Korean "훈" (meaning/semantic reading, e.g., 버금, 슬플)
   - **ko_eum**: Korean "음" (sound/phonetic reading, e.g., 아, 애)
   - **ko**: Korean meanings (comma-separated, e.g., 버금,아시아)
   - **en_meaning**: English meaning
   - Format: 'id|kanji|ko_hun|ko_eum|ko|emoji|en_meaning|...'
   - If there are multiple meanings, separate them with commas.
   - **Keep existing values unchanged; only fill empty fields.**

2. **Infer Emoji for Kanji**:
   - Look at the kanji character and infer an appropriate emoji that visually or conceptually represents it.
   - Place the emoji in the 'emoji' field.
   - If you cannot infer an appropriate emoji, leave the field empty.
   - Examples: 水 → 💧, 火 → 🔥, 山 → ⛰️, 愛 → ❤️, 犬 → 🐕

3. **Fill Missing Meanings in Examples**:
   - For every example word in 'onyomi', 'kunyomi', and 'unknown' fields (format 'word:ko:en'), fill in any empty 'ko' (Korean) or 'en' (English) fields.
   - Keep existing meanings unchanged.
   - **IMPORTANT**: The 'en' (English) field in example meanings must NEVER be empty. Always provide an English translation.

4. **Identify Primary Readings**:
   - In both 'onyomi_readings' and 'kunyomi_readings', mark exactly one primary reading (the most common/basic one) by prefixing it with an asterisk ('*').
   - Format: '*kana[word1:ko:en,...]'

5. **Resolve Unknown Readings**:
   - Compare the kana in 'unknown_readings' with the kana in 'onyomi_readings' and 'kunyomi_readings'.
   - **Matching Rule**: Ignore parentheses and contents (e.g., "あわ(れ)" becomes "あわれ") during comparison.
   - If a match is found: Move the example words from 'unknown' to the end of the matching reading's example list.
   - **Deduplication**: Do not add a word if it already exists in the target reading's list.
   - If no match is found or the unknown field is processed, always keep it empty in the final output.

# Data Format Rules
- **Structure**: 'id|kanji|ko_hun|ko_eum|ko|emoji|en_meaning|onyomi_readings|kunyomi_readings|unknown_readings'
- **Readings separator**: Semicolon (';') - Multiple readings are separated by semicolons
  Example: 'kana1[word1:ko1:en1];kana2[word2:ko2:en2]'
- **Example format**: 'word:ko_meaning:en_meaning'
- **Empty fields**: Represented as an empty string.
- **CRITICAL**: Every example word MUST have a non-empty 'en_meaning'. Do not leave 'en' empty.
- **CRITICAL**: Total 10 fields = 9 pipes per line.

# Example
- **Input**:
'2|哀|||슬플,애달플||アイ[哀悼:애도:,哀愁:애수:]|あわ(れ)[]|'
'3|愛|||||アイ[愛国:애국:,愛人:애인:]||'

- **Output**:
'2|哀|슬플|애|슬플,애달플|😢|pity, sorrow|*アイ[哀悼:애도:condolence,哀愁:애수:melancholy]|*あわれ[哀れ:비애:pity]|'
'3|愛|사랑|애|사랑|❤️|love|*アイ[愛国:애국:patriotism,愛人:애인:lover]||'

# Constraints
- Return **ONLY** the processed data. No introductory text or explanations.
- **Output format: Each kanji entry must be on a separate line** (one entry per line, separated by newlines).
- Maintain the exact number of pipes ('|') in each line (10 fields = 9 pipes).
- Strictly follow the asterisk ('*') rule: Max one per reading type.
- **Never leave 'en' empty in example meanings**.
- **Keep existing Korean meanings (ko_hun, ko_eum, ko) unchanged; only fill if empty.**

# Input Data"#;

/// A record of the enrichment output file. A batch that failed leaves its
/// records in the previous stage's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnriched {
    Enriched(Box<EnrichedRecord>),
    Pending(Box<KanjiRecord>),
}

#[derive(Debug, Default)]
pub struct EnrichStats {
    pub enriched: usize,
    pub failed_batches: usize,
}

/// Extracts the data actually sent to the LLM: ids, kana and examples.
/// Meanings are omitted since the merge prefers the original values anyway.
pub fn payload(record: &KanjiRecord) -> CompactRecord {
    fn readings(group: Option<&ReadingGroup>) -> Vec<CompactReading> {
        group
            .map(|group| {
                group
                    .readings
                    .iter()
                    .map(|reading| CompactReading {
                        kana: reading.kana.clone(),
                        is_primary: false,
                        examples: reading.examples.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    CompactRecord {
        id: record.id,
        kanji: record.kanji.clone(),
        emoji: String::new(),
        meanings: Default::default(),
        onyomi: readings(record.onyomi.as_ref()),
        kunyomi: readings(record.kunyomi.as_ref()),
        unknown: record
            .unknown
            .as_deref()
            .map(|unknown| {
                unknown
                    .iter()
                    .map(|reading| CompactReading {
                        kana: reading.kana.clone(),
                        is_primary: false,
                        examples: reading.examples.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Runs the whole enrichment loop. `audit` receives every raw LLM response
/// before it is decoded, `persist` the full record list after every
/// successful batch, so an interrupted run keeps its completed batches.
pub fn enrich_records(
    client: &GeminiClient,
    records: Vec<KanjiRecord>,
    batch_size: usize,
    limiter: &mut FixedDelay,
    mut audit: impl FnMut(usize, &str) -> eyre::Result<()>,
    mut persist: impl FnMut(&[MaybeEnriched]) -> eyre::Result<()>,
) -> eyre::Result<(Vec<MaybeEnriched>, EnrichStats)> {
    eyre::ensure!(batch_size > 0, "batch size must be at least 1");

    let mut results = records
        .iter()
        .map(|record| MaybeEnriched::Pending(Box::new(record.clone())))
        .collect::<Vec<_>>();
    let mut stats = EnrichStats::default();
    let total_batches = records.len().div_ceil(batch_size);

    for (batch_index, batch) in records.chunks(batch_size).enumerate() {
        tracing::info!(
            "processing batch {}/{total_batches} ({} records)",
            batch_index + 1,
            batch.len()
        );
        let payloads = batch.iter().map(payload).collect::<Vec<_>>();
        let prompt = format!("{PROMPT_TEMPLATE}\n{}", codec::encode_batch(&payloads));

        limiter.pause();
        let raw = match client.generate(&prompt) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!("batch {} failed, leaving it unenriched: {error:#}", batch_index + 1);
                stats.failed_batches += 1;
                continue;
            }
        };
        audit(batch_index, &raw)?;

        let decoded = codec::decode_batch(&raw);
        if decoded.len() < batch.len() {
            tracing::warn!(
                "batch {} returned {} of {} records, leaving it unenriched",
                batch_index + 1,
                decoded.len(),
                batch.len()
            );
            stats.failed_batches += 1;
            continue;
        }

        for (j, (original, llm)) in batch.iter().zip(&decoded).enumerate() {
            let merged = merge_llm_record(original, llm, original);
            results[batch_index * batch_size + j] = MaybeEnriched::Enriched(Box::new(merged));
        }
        stats.enriched += batch.len();
        persist(&results)?;
    }

    Ok((results, stats))
}

/// Folds one decoded LLM record back into its original.
///
/// `batch_input` is the record whose compact form was sent to the LLM; a
/// reading the LLM invented inherits `romaji`/`isPrimary` from it when the
/// kana is found there, and is defaulted otherwise.
pub fn merge_llm_record(
    original: &KanjiRecord,
    llm: &CompactRecord,
    batch_input: &KanjiRecord,
) -> EnrichedRecord {
    let original_meanings = original.meanings.clone().unwrap_or_default();

    let ko_hun = pick(&original_meanings.ko_hun, &llm.meanings.ko_hun);
    let ko_eum = pick(&original_meanings.ko_eum, &llm.meanings.ko_eum);
    let ko = if !original_meanings.ko.is_empty() {
        original_meanings.ko.clone()
    } else {
        llm.meanings.ko.clone()
    };
    let en_source = pick(&llm.meanings.en, &original_meanings.en);
    let en = split_meanings(&en_source);

    let visual_data = visual_data_from_emoji(&llm.emoji);

    let onyomi = merge_group(
        original.onyomi.clone(),
        &llm.onyomi,
        batch_input.onyomi.as_ref(),
    );
    let kunyomi = merge_group(
        original.kunyomi.clone(),
        &llm.kunyomi,
        batch_input.kunyomi.as_ref(),
    );

    EnrichedRecord {
        id: original.id,
        kanji: original.kanji.clone(),
        level: original.level.clone(),
        radical: original.radical.clone(),
        ref_url: original.ref_url.clone(),
        image: original.image.clone(),
        visual_data,
        shape_description: original.shape_description.clone(),
        meanings: EnrichedMeanings {
            ko_hun,
            ko_eum,
            ko,
            en,
        },
        onyomi,
        kunyomi,
    }
}

fn pick(preferred: &str, fallback: &str) -> String {
    if !preferred.is_empty() {
        preferred.to_string()
    } else {
        fallback.to_string()
    }
}

fn split_meanings(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn visual_data_from_emoji(emoji: &str) -> VisualData {
    let emoji = emoji.trim();
    if emoji.is_empty() {
        VisualData::Image(String::new())
    } else {
        VisualData::Emoji(emoji.to_string())
    }
}

fn merge_group(
    original: Option<ReadingGroup>,
    llm: &[CompactReading],
    batch_input: Option<&ReadingGroup>,
) -> ReadingGroup {
    let mut group = original.unwrap_or_default();
    for llm_reading in llm {
        match group
            .readings
            .iter_mut()
            .find(|reading| reading.kana == llm_reading.kana)
        {
            Some(existing) => fill_examples(&mut existing.examples, &llm_reading.examples),
            None => {
                let template = batch_input.and_then(|group| {
                    group
                        .readings
                        .iter()
                        .find(|reading| reading.kana == llm_reading.kana)
                });
                group.readings.push(Reading {
                    kana: llm_reading.kana.clone(),
                    romaji: template.map(|r| r.romaji.clone()).unwrap_or_default(),
                    is_primary: template.map(|r| r.is_primary).unwrap_or(false),
                    examples: llm_reading.examples.clone(),
                });
            }
        }
    }
    group.enforce_primary();
    group
}

/// Unions `llm_examples` into `target` by word. LLM meanings only fill empty
/// `ko`/`en` fields of a matching word, never overwrite non-empty ones.
fn fill_examples(target: &mut Vec<Example>, llm_examples: &[Example]) {
    for llm_example in llm_examples {
        match target.iter_mut().find(|e| e.word == llm_example.word) {
            Some(existing) => {
                if existing.meaning.ko.is_empty() {
                    existing.meaning.ko = llm_example.meaning.ko.clone();
                }
                if existing.meaning.en.is_empty() {
                    existing.meaning.en = llm_example.meaning.en.clone();
                }
            }
            None => target.push(llm_example.clone()),
        }
    }
}
