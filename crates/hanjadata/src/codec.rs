//! The compressed pipe-and-bracket format used for LLM exchange.
//!
//! One record per line, ten `|`-separated fields:
//!
//! ```text
//! id|kanji|ko_hun|ko_eum|ko|emoji|en|onyomi|kunyomi|unknown
//! ```
//!
//! Each reading field is a `;`-joined list of `kana[word:ko:en,...]` groups,
//! with a leading `*` marking the group's primary reading. The format has no
//! escaping for its own delimiters, so the encoder strips them from text
//! fields instead; see the decoding notes on `decode_line` for the legacy
//! arities the decoder still accepts.

use hanjadata_core::records::{Example, ExampleMeaning};

/// The meta characters of a reading field. They can never appear inside
/// encoded kana, word or meaning text, so the encoder drops them. Top-level
/// meaning fields only reserve `|` (and `,` as their own list separator).
const META_CHARS: &[char] = &['|', ';', '[', ']', ',', ':'];

/// A record in its compact, LLM-facing shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactRecord {
    pub id: u32,
    pub kanji: String,
    pub emoji: String,
    pub meanings: CompactMeanings,
    pub onyomi: Vec<CompactReading>,
    pub kunyomi: Vec<CompactReading>,
    pub unknown: Vec<CompactReading>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactMeanings {
    pub ko_hun: String,
    pub ko_eum: String,
    pub ko: Vec<String>,
    pub en: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactReading {
    pub kana: String,
    pub is_primary: bool,
    pub examples: Vec<Example>,
}

fn strip_meta(text: &str) -> String {
    text.chars().filter(|c| !META_CHARS.contains(c)).collect()
}

fn strip_pipes(text: &str) -> String {
    text.chars().filter(|c| *c != '|').collect()
}

pub fn encode_record(record: &CompactRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        record.id,
        strip_pipes(&record.kanji),
        strip_pipes(&record.meanings.ko_hun),
        strip_pipes(&record.meanings.ko_eum),
        record
            .meanings
            .ko
            .iter()
            .map(|m| strip_meta(m))
            .collect::<Vec<_>>()
            .join(","),
        strip_pipes(&record.emoji),
        strip_pipes(&record.meanings.en),
        encode_readings(&record.onyomi),
        encode_readings(&record.kunyomi),
        encode_readings(&record.unknown),
    )
}

fn encode_readings(readings: &[CompactReading]) -> String {
    readings
        .iter()
        .map(|reading| {
            let examples = reading
                .examples
                .iter()
                .map(|example| {
                    format!(
                        "{}:{}:{}",
                        strip_meta(&example.word),
                        strip_meta(&example.meaning.ko),
                        strip_meta(&example.meaning.en)
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            let prefix = if reading.is_primary { "*" } else { "" };
            format!("{}{}[{}]", prefix, strip_meta(&reading.kana), examples)
        })
        .collect::<Vec<_>>()
        .join(";")
}

pub fn encode_batch(records: &[CompactRecord]) -> String {
    records
        .iter()
        .map(encode_record)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes a whole response, skipping blank lines and any markdown code
/// fence the LLM wrapped the data in.
pub fn decode_batch(text: &str) -> Vec<CompactRecord> {
    strip_code_fence(text)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(decode_line)
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the fence line with its optional language tag
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim_end()
}

/// Decodes one line. Three arities are accepted for backward compatibility:
/// the current 10-field form, the legacy 7-field form
/// (`id|kanji|emoji|en|onyomi|kunyomi|unknown`) and the minimal form of up to
/// 5 fields (`id|kanji|onyomi|kunyomi|unknown`). Missing or empty segments
/// decode to empty containers; a malformed id decodes to 0.
pub fn decode_line(line: &str) -> CompactRecord {
    let parts = line.split('|').collect::<Vec<_>>();
    let id = parts
        .first()
        .and_then(|id| id.trim().parse().ok())
        .unwrap_or(0);
    let kanji = parts.get(1).unwrap_or(&"").trim().to_string();
    let field = |i: usize| parts.get(i).copied().unwrap_or("");

    if parts.len() >= 10 {
        CompactRecord {
            id,
            kanji,
            emoji: field(5).trim().to_string(),
            meanings: CompactMeanings {
                ko_hun: field(2).trim().to_string(),
                ko_eum: field(3).trim().to_string(),
                ko: split_list(field(4)),
                en: field(6).trim().to_string(),
            },
            onyomi: parse_readings(field(7)),
            kunyomi: parse_readings(field(8)),
            unknown: parse_readings(field(9)),
        }
    } else if parts.len() >= 7 {
        CompactRecord {
            id,
            kanji,
            emoji: field(2).trim().to_string(),
            meanings: CompactMeanings {
                en: field(3).trim().to_string(),
                ..CompactMeanings::default()
            },
            onyomi: parse_readings(field(4)),
            kunyomi: parse_readings(field(5)),
            unknown: parse_readings(field(6)),
        }
    } else {
        CompactRecord {
            id,
            kanji,
            emoji: String::new(),
            meanings: CompactMeanings::default(),
            onyomi: parse_readings(field(2)),
            kunyomi: parse_readings(field(3)),
            unknown: parse_readings(field(4)),
        }
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parses a `;`-joined reading list. A group without brackets decodes to a
/// bare kana with no examples.
pub fn parse_readings(text: &str) -> Vec<CompactReading> {
    if text.trim().is_empty() {
        return vec![];
    }
    text.split(';')
        .map(|group| {
            let group = group.trim();
            let (is_primary, group) = match group.strip_prefix('*') {
                Some(rest) => (true, rest),
                None => (false, group),
            };
            let Some((kana, rest)) = group.split_once('[') else {
                return CompactReading {
                    kana: group.trim().to_string(),
                    is_primary,
                    examples: vec![],
                };
            };
            let examples = rest
                .strip_suffix(']')
                .unwrap_or(rest)
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(parse_example)
                .collect();
            CompactReading {
                kana: kana.trim().to_string(),
                is_primary,
                examples,
            }
        })
        .collect()
}

fn parse_example(text: &str) -> Example {
    let mut parts = text.splitn(3, ':');
    let word = parts.next().unwrap_or("").trim().to_string();
    let ko = parts.next().unwrap_or("").trim().to_string();
    let en = parts.next().unwrap_or("").trim().to_string();
    Example {
        word,
        meaning: ExampleMeaning { ko, en },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reading(kana: &str, is_primary: bool, examples: &[(&str, &str, &str)]) -> CompactReading {
        CompactReading {
            kana: kana.to_string(),
            is_primary,
            examples: examples
                .iter()
                .map(|(word, ko, en)| Example {
                    word: word.to_string(),
                    meaning: ExampleMeaning {
                        ko: ko.to_string(),
                        en: en.to_string(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn encodes_ten_fields() {
        let record = CompactRecord {
            id: 2,
            kanji: "哀".to_string(),
            emoji: "😢".to_string(),
            meanings: CompactMeanings {
                ko_hun: "슬플".to_string(),
                ko_eum: "애".to_string(),
                ko: vec!["슬플".to_string(), "애달플".to_string()],
                en: "pity".to_string(),
            },
            onyomi: vec![reading("アイ", true, &[("哀悼", "애도", "condolence")])],
            kunyomi: vec![],
            unknown: vec![reading("あわ(れ)", false, &[])],
        };
        let line = encode_record(&record);
        assert_eq!(
            line,
            "2|哀|슬플|애|슬플,애달플|😢|pity|*アイ[哀悼:애도:condolence]||あわ(れ)[]"
        );
        assert_eq!(line.matches('|').count(), 9);
    }

    #[test]
    fn round_trips() {
        let record = CompactRecord {
            id: 3,
            kanji: "愛".to_string(),
            emoji: "❤️".to_string(),
            meanings: CompactMeanings {
                ko_hun: "사랑".to_string(),
                ko_eum: "애".to_string(),
                ko: vec!["사랑".to_string()],
                en: "love".to_string(),
            },
            onyomi: vec![reading(
                "アイ",
                true,
                &[("愛国", "애국", "patriotism"), ("愛人", "애인", "lover")],
            )],
            kunyomi: vec![reading("いと(しい)", false, &[("愛しい", "", "")])],
            unknown: vec![],
        };
        let decoded = decode_line(&encode_record(&record));
        assert_eq!(decoded, record);
    }

    #[test]
    fn decodes_legacy_seven_fields() {
        let record = decode_line("3|愛|❤️|love|*アイ[愛国:애국:patriotism]||");
        assert_eq!(record.id, 3);
        assert_eq!(record.emoji, "❤️");
        assert_eq!(record.meanings.en, "love");
        assert!(record.meanings.ko.is_empty());
        assert!(record.onyomi[0].is_primary);
        assert_eq!(record.onyomi[0].examples[0].word, "愛国");
        assert!(record.kunyomi.is_empty());
    }

    #[test]
    fn decodes_minimal_fields() {
        let record = decode_line("7|悪|アク[]|わる(い)[]");
        assert_eq!(record.id, 7);
        assert_eq!(record.onyomi[0].kana, "アク");
        assert_eq!(record.kunyomi[0].kana, "わる(い)");
        assert!(record.unknown.is_empty());
    }

    #[test]
    fn empty_segments_never_fail() {
        let record = decode_line("x|||||||||");
        assert_eq!(record.id, 0);
        assert!(record.onyomi.is_empty());
        assert!(record.kunyomi.is_empty());
        assert!(record.unknown.is_empty());
    }

    #[test]
    fn group_without_brackets_decodes_bare() {
        let readings = parse_readings("*アイ");
        assert_eq!(readings[0].kana, "アイ");
        assert!(readings[0].is_primary);
        assert!(readings[0].examples.is_empty());
    }

    #[test]
    fn strips_markdown_fence() {
        let text = "```text\n3|愛|||||love|||\n```";
        let records = decode_batch(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].meanings.en, "love");
    }

    #[test]
    fn encoder_drops_delimiters_from_text() {
        let record = CompactRecord {
            id: 1,
            kanji: "愛".to_string(),
            emoji: String::new(),
            meanings: CompactMeanings {
                en: "love, affection".to_string(),
                ..CompactMeanings::default()
            },
            onyomi: vec![reading("アイ", false, &[("愛[国]", "애:국", "a|b")])],
            kunyomi: vec![],
            unknown: vec![],
        };
        let line = encode_record(&record);
        assert_eq!(line.matches('|').count(), 9);
        let decoded = decode_line(&line);
        // commas are legitimate in the top-level meaning fields
        assert_eq!(decoded.meanings.en, "love, affection");
        assert_eq!(decoded.onyomi[0].examples[0].word, "愛国");
        assert_eq!(decoded.onyomi[0].examples[0].meaning.en, "ab");
    }
}
