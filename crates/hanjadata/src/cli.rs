use clap::{Parser, Subcommand};
use hanjadata::llm::DEFAULT_MODEL;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converts the Japanese-keyed metadata file to English keys.
    ConvertMeta {
        /// The path to the input kanji_meta_ja.json file.
        #[arg(short, long)]
        input: PathBuf,
        /// The path to the output kanji_meta_en.json file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Merges the school-grade table into the metadata records.
    MergeGrade {
        /// The path to the kanji_meta_en.json file.
        #[arg(short, long)]
        meta: PathBuf,
        /// The path to the kanji_grade.json file.
        #[arg(short, long)]
        grade: PathBuf,
        /// The path to the output merged file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Merges dictionary readings into the graded records.
    MergeReadings {
        /// The path to the grade-merged file.
        #[arg(short, long)]
        base: PathBuf,
        /// The path to the kanji_reading.json dictionary file.
        #[arg(short, long)]
        readings: PathBuf,
        /// The path to the output merged file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Merges scraped detail pages into the reading-merged records.
    MergeScraped {
        /// The path to the reading-merged file.
        #[arg(short, long)]
        base: PathBuf,
        /// The path to the kanji_scraped.json file.
        #[arg(short, long)]
        scraped: PathBuf,
        /// The path to the output merged file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Fills missing meanings, emoji and primary readings with an LLM.
    Enrich {
        /// The path to the scrape-merged file.
        #[arg(short, long)]
        input: PathBuf,
        /// The path to the output enriched file.
        #[arg(short, long)]
        output: PathBuf,
        /// The path to the file raw LLM responses are appended to.
        #[arg(short, long)]
        audit_log: PathBuf,
        /// How many records to send per LLM call.
        #[arg(short, long, default_value_t = 178)]
        batch_size: usize,
        /// The Gemini model to use.
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
    /// Wraps the enriched records into the versioned dataset artifact.
    Export {
        /// The path to the enriched file.
        #[arg(short, long)]
        input: PathBuf,
        /// The path to the output data.json file.
        #[arg(short, long)]
        output: PathBuf,
        /// The dataset version to embed.
        #[arg(short, long, default_value = "0.0.0")]
        version: String,
    },
    /// Downloads the stroke-order images referenced by the records.
    DownloadImages {
        /// The path to the scrape-merged file.
        #[arg(short, long)]
        input: PathBuf,
        /// The directory to download the images into.
        #[arg(short, long)]
        dir: PathBuf,
    },
    /// Generates reading audio files with a TTS provider.
    Tts {
        /// The path to the enriched file.
        #[arg(short, long)]
        input: PathBuf,
        /// The directory to write the audio files into.
        #[arg(short, long)]
        dir: PathBuf,
    },
}
