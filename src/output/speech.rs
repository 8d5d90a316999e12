// file: src/output/speech.rs
// description: queued text to speech for categorized items, one utterance at a time

use crate::config::OutputConfig;
use crate::error::{PipelineError, Result};
use crate::models::CategorizedRecord;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[async_trait]
pub trait Speaker: Send + Sync {
    /// Queues the item for reading and returns without waiting for playback.
    fn speak(&self, title: &str, summary: &str, category: &str) -> Result<()>;

    /// Waits until everything queued so far has been played.
    async fn finish(&self) {}
}

pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
    fn speak(&self, _title: &str, _summary: &str, _category: &str) -> Result<()> {
        Ok(())
    }
}

/// Hands the text to an external tts program such as `espeak` or `say`.
/// Utterances run one after another on a background task, never overlapping.
/// Must be created inside a tokio runtime.
pub struct CommandSpeaker {
    command: String,
    queue: Mutex<Option<UnboundedSender<String>>>,
    player: Mutex<Option<JoinHandle<()>>>,
}

impl CommandSpeaker {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let player = tokio::spawn(play_queue(command.clone(), args, rx));

        Self {
            command,
            queue: Mutex::new(Some(tx)),
            player: Mutex::new(Some(player)),
        }
    }

    pub fn utterance(title: &str, summary: &str, category: &str) -> String {
        format!("{} - {}. Category: {}", title, summary.trim(), category.trim())
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    fn speak(&self, title: &str, summary: &str, category: &str) -> Result<()> {
        let text = Self::utterance(title, summary, category);
        debug!("Queueing speech via {}: {}", self.command, title);

        let queue = self
            .queue
            .lock()
            .map_err(|_| PipelineError::Validation("speech queue poisoned".to_string()))?;
        let queued = queue.as_ref().is_some_and(|tx| tx.send(text).is_ok());
        if !queued {
            return Err(PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "speech queue is closed",
            )));
        }
        Ok(())
    }

    async fn finish(&self) {
        // closing the sender lets the player drain and exit
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
        let player = self.player.lock().ok().and_then(|mut p| p.take());
        if let Some(player) = player
            && let Err(e) = player.await
        {
            warn!("Speech player stopped unexpectedly: {}", e);
        }
    }
}

async fn play_queue(command: String, args: Vec<String>, mut rx: UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        let status = Command::new(&command)
            .args(&args)
            .arg(&text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if !status.success() => {
                warn!("Speech command {} exited with {}", command, status);
            }
            Err(e) => warn!("Speech command {} failed: {}", command, e),
            Ok(_) => {}
        }
    }
}

pub fn speaker_from_config(config: &OutputConfig, enabled: bool) -> Box<dyn Speaker> {
    if enabled || config.speech_enabled {
        Box::new(CommandSpeaker::new(
            config.speech_command.clone(),
            config.speech_args.clone(),
        ))
    } else {
        Box::new(NoopSpeaker)
    }
}

/// Queues each item once, logging failures. Returns how many were queued.
pub fn speak_all(speaker: &dyn Speaker, items: &[CategorizedRecord]) -> usize {
    items
        .iter()
        .filter(|item| match speaker.speak(&item.title, &item.summary, &item.category) {
            Ok(()) => true,
            Err(e) => {
                warn!("Speech failed for '{}': {}", item.title, e);
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recording {
        spoken: Mutex<Vec<String>>,
    }

    impl Speaker for Recording {
        fn speak(&self, title: &str, summary: &str, category: &str) -> Result<()> {
            self.spoken
                .lock()
                .unwrap()
                .push(CommandSpeaker::utterance(title, summary, category));
            Ok(())
        }
    }

    fn items() -> Vec<CategorizedRecord> {
        vec![
            CategorizedRecord {
                title: "A".into(),
                summary: "first ".into(),
                category: "Tech".into(),
            },
            CategorizedRecord {
                title: "B".into(),
                summary: "second".into(),
                category: "Sports".into(),
            },
        ]
    }

    #[test]
    fn test_speak_all_once_per_item() {
        let speaker = Recording::default();
        assert_eq!(speak_all(&speaker, &items()), 2);
        assert_eq!(
            *speaker.spoken.lock().unwrap(),
            vec!["A - first. Category: Tech", "B - second. Category: Sports"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_playback_is_sequential_and_does_not_block() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("speech.log");
        let script = r#"echo start >> "$0"; sleep 0.3; echo end >> "$0""#;
        let speaker = CommandSpeaker::new(
            "sh",
            vec![
                "-c".to_string(),
                script.to_string(),
                log.display().to_string(),
            ],
        );

        let mut three = items();
        three.push(items().remove(0));

        let started = Instant::now();
        assert_eq!(speak_all(&speaker, &three), 3);
        assert!(started.elapsed() < Duration::from_millis(300));

        speaker.finish().await;

        let played = std::fs::read_to_string(&log).unwrap();
        assert_eq!(played, "start\nend\nstart\nend\nstart\nend\n");
    }

    #[tokio::test]
    async fn test_missing_command_is_logged_not_fatal() {
        let speaker = CommandSpeaker::new("definitely-not-a-tts-binary", vec![]);
        assert_eq!(speak_all(&speaker, &items()), 2);
        speaker.finish().await;
    }

    #[tokio::test]
    async fn test_speak_after_finish_is_rejected() {
        let speaker = CommandSpeaker::new("true", vec![]);
        speaker.finish().await;
        assert!(speaker.speak("A", "x", "Tech").is_err());
    }

    #[test]
    fn test_speaker_from_config() {
        let config = OutputConfig::default();
        assert!(speaker_from_config(&config, false).speak("a", "b", "c").is_ok());
    }
}
