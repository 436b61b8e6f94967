//! Resolves `unknown` readings into their canonical onyomi/kunyomi group.
//!
//! Scraped reading lists often write optional okurigana in parentheses
//! (`あわ(れ)`), while the dictionary table carries the plain form
//! (`あわれ`). Readings are compared with the parentheses stripped; a
//! matching unknown entry donates its example words to the canonical reading
//! and is dropped.

use hanjadata_core::records::{Example, Reading, ReadingGroup};

/// Strips the parenthesis marks so `あわ(れ)` compares equal to `あわれ`.
/// Both ASCII and full-width parentheses appear in scraped kana.
pub fn normalize_kana(kana: &str) -> String {
    kana.chars()
        .filter(|c| !matches!(c, '(' | ')' | '（' | '）'))
        .collect()
}

/// Appends `extra` examples to `target`, skipping any word already present.
pub fn merge_examples(target: &mut Vec<Example>, extra: Vec<Example>) {
    for example in extra {
        if !target.iter().any(|e| e.word == example.word) {
            target.push(example);
        }
    }
}

/// Resolves unknown readings against the onyomi and kunyomi groups.
///
/// Onyomi is checked before kunyomi, so a kana that could match both lands
/// in onyomi. Returns the entries that matched nothing, or `None` when every
/// entry was resolved; running it again on the result is a no-op.
pub fn resolve_unknown(
    onyomi: &mut ReadingGroup,
    kunyomi: &mut ReadingGroup,
    unknown: Vec<Reading>,
) -> Option<Vec<Reading>> {
    let mut remaining = vec![];
    for entry in unknown {
        if entry.kana.is_empty() {
            remaining.push(entry);
            continue;
        }
        let normalized = normalize_kana(&entry.kana);
        let target = find_reading(onyomi, &normalized)
            .or_else(|| find_reading(kunyomi, &normalized));
        match target {
            Some(reading) => merge_examples(&mut reading.examples, entry.examples),
            None => remaining.push(entry),
        }
    }
    if remaining.is_empty() {
        None
    } else {
        Some(remaining)
    }
}

fn find_reading<'a>(group: &'a mut ReadingGroup, normalized: &str) -> Option<&'a mut Reading> {
    group
        .readings
        .iter_mut()
        .find(|reading| normalize_kana(&reading.kana) == normalized)
}

#[cfg(test)]
mod test {
    use super::*;
    use hanjadata_core::records::{Description, ExampleMeaning};

    fn reading(kana: &str, examples: &[&str]) -> Reading {
        Reading {
            kana: kana.to_string(),
            romaji: String::new(),
            is_primary: false,
            examples: examples
                .iter()
                .map(|word| Example {
                    word: word.to_string(),
                    meaning: ExampleMeaning::default(),
                })
                .collect(),
        }
    }

    fn group(readings: Vec<Reading>) -> ReadingGroup {
        ReadingGroup {
            readings,
            description: Description::default(),
        }
    }

    #[test]
    fn normalizes_parenthesized_kana() {
        assert_eq!(normalize_kana("あわ(れ)"), "あわれ");
        assert_eq!(normalize_kana("あわ（れ）"), "あわれ");
        assert_eq!(normalize_kana("アイ"), "アイ");
    }

    #[test]
    fn resolves_matching_unknown() {
        let mut onyomi = group(vec![reading("アイ", &[])]);
        let mut kunyomi = group(vec![reading("あわれ", &[])]);
        let unknown = vec![reading("あわ(れ)", &["哀れ"])];

        let remaining = resolve_unknown(&mut onyomi, &mut kunyomi, unknown);
        assert!(remaining.is_none());
        assert_eq!(kunyomi.readings[0].examples[0].word, "哀れ");
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut onyomi = group(vec![]);
        let mut kunyomi = group(vec![reading("あわれ", &[])]);

        let remaining =
            resolve_unknown(&mut onyomi, &mut kunyomi, vec![reading("あわ(れ)", &["哀れ"])]);
        assert!(remaining.is_none());
        assert_eq!(kunyomi.readings[0].examples.len(), 1);

        // resolving the already-donated examples again must not duplicate them
        let remaining =
            resolve_unknown(&mut onyomi, &mut kunyomi, vec![reading("あわ(れ)", &["哀れ"])]);
        assert!(remaining.is_none());
        assert_eq!(kunyomi.readings[0].examples.len(), 1);
    }

    #[test]
    fn onyomi_wins_over_kunyomi() {
        let mut onyomi = group(vec![reading("あい", &[])]);
        let mut kunyomi = group(vec![reading("あい", &[])]);

        resolve_unknown(&mut onyomi, &mut kunyomi, vec![reading("あい", &["愛"])]);
        assert_eq!(onyomi.readings[0].examples.len(), 1);
        assert!(kunyomi.readings[0].examples.is_empty());
    }

    #[test]
    fn unmatched_entries_are_retained() {
        let mut onyomi = group(vec![reading("アイ", &[])]);
        let mut kunyomi = group(vec![]);

        let remaining = resolve_unknown(
            &mut onyomi,
            &mut kunyomi,
            vec![reading("めずら(しい)", &["珍しい"])],
        );
        let remaining = remaining.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kana, "めずら(しい)");
    }

    #[test]
    fn merge_examples_dedups_by_word() {
        let mut target = vec![Example {
            word: "哀れ".to_string(),
            meaning: ExampleMeaning {
                ko: "비애".to_string(),
                en: "pity".to_string(),
            },
        }];
        merge_examples(
            &mut target,
            vec![
                Example {
                    word: "哀れ".to_string(),
                    meaning: ExampleMeaning::default(),
                },
                Example {
                    word: "哀れむ".to_string(),
                    meaning: ExampleMeaning::default(),
                },
            ],
        );
        assert_eq!(target.len(), 2);
        assert_eq!(target[0].meaning.en, "pity");
    }
}
