//! Pipeline stages for building the hanja learning dataset.
//!
//! Each stage reads one JSON artifact and writes the next one; the binary in
//! `main.rs` exposes one subcommand per stage.

pub mod codec;
pub mod download;
pub mod enrich;
pub mod input;
pub mod llm;
pub mod merge;
pub mod net;
pub mod reconcile;
pub mod scan;
pub mod tts;
