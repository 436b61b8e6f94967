//! Models the dictionary reading table.
//!
//! The table predates the rest of the pipeline and carries two legacy shapes:
//! an example may be a bare word string, and a meaning may be a bare Korean
//! string. Both are modeled as untagged variants and normalized on
//! conversion.

use hanjadata_core::records::{Example, ExampleMeaning};
use serde::{Deserialize, Serialize};

/// One dictionary entry; a single entry may cover several kanji.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictEntry {
    pub kanji: Vec<String>,
    pub readings: Vec<DictReading>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictReading {
    pub reading: String,
    #[serde(default)]
    pub examples: Vec<DictExample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DictExample {
    Word(String),
    Entry {
        word: String,
        #[serde(default)]
        meaning: Option<DictMeaning>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DictMeaning {
    Text(String),
    Localized {
        #[serde(default)]
        ko: String,
        #[serde(default)]
        en: String,
    },
}

impl DictExample {
    /// Normalizes any legacy shape to the standard example form.
    pub fn normalize(self) -> Example {
        match self {
            DictExample::Word(word) => Example {
                word,
                meaning: ExampleMeaning::default(),
            },
            DictExample::Entry { word, meaning } => {
                let meaning = match meaning {
                    Some(DictMeaning::Text(ko)) => ExampleMeaning {
                        ko,
                        en: String::new(),
                    },
                    Some(DictMeaning::Localized { ko, en }) => ExampleMeaning { ko, en },
                    None => ExampleMeaning::default(),
                };
                Example { word, meaning }
            }
        }
    }
}
