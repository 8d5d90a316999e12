// file: src/output/mod.rs
// description: presentation of pipeline results
// reference: internal module structure

pub mod json;
pub mod speech;
pub mod terminal;

pub use json::{JsonExporter, NewsReport, ReportItem};
pub use speech::{CommandSpeaker, NoopSpeaker, Speaker, speak_all, speaker_from_config};
pub use terminal::TerminalRenderer;
