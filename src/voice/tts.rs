//! Text-to-speech (TTS) processing

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::store::AudioStore;
use crate::{Error, Result};

/// Voice used for the `hombre` selector and for unknown selectors
pub const MALE_VOICE: &str = "es-AR-TomasNeural";

/// Voice used for the `mujer` selector
pub const FEMALE_VOICE: &str = "es-AR-ElenaNeural";

/// Default bound on a single synthesis run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Characters outside this set are stripped before synthesis
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_\sáéíóúüñÁÉÍÓÚÜÑ¿¡.,!?;:\-]").expect("valid regex")
});

/// Map a gender selector to a synthesis voice
#[must_use]
pub fn voice_for(gender: &str) -> &'static str {
    match gender {
        "mujer" => FEMALE_VOICE,
        _ => MALE_VOICE,
    }
}

/// Strip characters the engine should never see
#[must_use]
pub fn sanitize(text: &str) -> String {
    DISALLOWED
        .replace_all(text, "")
        .replace('"', "'")
        .trim()
        .to_string()
}

/// Backend that renders text into an audio file
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Render `text` with `voice` into `out`
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails
    async fn render(&self, text: &str, voice: &str, out: &Path) -> Result<()>;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// Edge TTS command-line engine
///
/// Arguments are passed as a list, never through a shell.
#[derive(Debug, Clone)]
pub struct EdgeTts {
    program: PathBuf,
}

impl EdgeTts {
    /// Use the given executable as-is
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `bin` on `PATH`, falling back to the bare name
    ///
    /// A missing binary is not fatal; synthesis will fail per request and
    /// the relay keeps answering without audio.
    #[must_use]
    pub fn locate(bin: &str) -> Self {
        match which::which(bin) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "found TTS engine");
                Self::new(path)
            }
            Err(e) => {
                tracing::warn!(bin, error = %e, "TTS engine not found on PATH, replies will have no audio");
                Self::new(bin)
            }
        }
    }
}

#[async_trait]
impl SpeechEngine for EdgeTts {
    async fn render(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--voice")
            .arg(voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Tts(format!("failed to spawn {}: {e}", self.program.display())))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Tts(format!(
                "edge-tts exited with code {code}: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "edge-tts"
    }
}

/// Turns reply text into a downloadable audio file in the store
#[derive(Clone)]
pub struct SpeechSynthesizer {
    engine: Arc<dyn SpeechEngine>,
    store: Arc<AudioStore>,
    timeout: Duration,
}

impl SpeechSynthesizer {
    /// Create a synthesizer writing into `store`
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>, store: Arc<AudioStore>) -> Self {
        Self {
            engine,
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-run timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Synthesize `text` with `voice`
    ///
    /// # Returns
    ///
    /// The generated file name inside the store's audio directory
    ///
    /// # Errors
    ///
    /// Returns `Error::Tts` on timeout, engine failure, empty input or a
    /// missing output file
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<String> {
        let clean = sanitize(text);
        if clean.is_empty() {
            return Err(Error::Tts("nothing left to synthesize after sanitizing".to_string()));
        }

        let (name, path) = self.store.new_audio_file();
        tracing::debug!(engine = self.engine.name(), voice, file = %name, "synthesizing reply");

        let rendered = match tokio::time::timeout(self.timeout, self.engine.render(&clean, voice, &path)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Tts(format!(
                "{} timed out after {}s",
                self.engine.name(),
                self.timeout.as_secs_f32()
            ))),
        };

        if let Err(e) = rendered {
            discard(&path).await;
            return Err(e);
        }

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::Tts("audio file was not generated".to_string()));
        }

        tracing::info!(file = %name, "reply audio ready");
        Ok(name)
    }
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "failed to discard partial audio");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct WritingEngine {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SpeechEngine for WritingEngine {
        async fn render(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push((text.to_string(), voice.to_string()));
            tokio::fs::write(out, b"ID3").await?;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "writing"
        }
    }

    struct SilentEngine;

    #[async_trait]
    impl SpeechEngine for SilentEngine {
        async fn render(&self, _text: &str, _voice: &str, _out: &Path) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "silent"
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl SpeechEngine for SlowEngine {
        async fn render(&self, _text: &str, _voice: &str, out: &Path) -> Result<()> {
            tokio::fs::write(out, b"partial").await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn store() -> (tempfile::TempDir, Arc<AudioStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AudioStore::open(dir.path()).unwrap());
        (dir, store)
    }

    #[test]
    fn voice_selection_defaults_to_male() {
        assert_eq!(voice_for("hombre"), MALE_VOICE);
        assert_eq!(voice_for("mujer"), FEMALE_VOICE);
        assert_eq!(voice_for("robot"), MALE_VOICE);
        assert_eq!(voice_for(""), MALE_VOICE);
    }

    #[test]
    fn sanitize_keeps_spanish_text() {
        assert_eq!(
            sanitize("  ¡Dale, pibe! ¿Vamos a la esquina? Ñandú: sí-no.  "),
            "¡Dale, pibe! ¿Vamos a la esquina? Ñandú: sí-no."
        );
    }

    #[test]
    fn sanitize_strips_shell_metacharacters() {
        assert_eq!(sanitize("hola $(rm -rf /) `x` \"che\" <b>"), "hola rm -rf  x che b");
        assert_eq!(sanitize("emoji 🍺 y & | ;"), "emoji  y   ;");
    }

    #[tokio::test]
    async fn synthesize_returns_file_name() {
        let (_dir, store) = store();
        let engine = Arc::new(WritingEngine {
            seen: Mutex::new(Vec::new()),
        });
        let synth = SpeechSynthesizer::new(engine.clone(), store.clone());

        let name = synth.synthesize("Dale, te sigo 🍺", MALE_VOICE).await.unwrap();

        assert!(name.ends_with(".mp3"));
        assert!(store.audio_dir().join(&name).is_file());
        assert_eq!(
            engine.seen.lock().unwrap().as_slice(),
            &[("Dale, te sigo".to_string(), MALE_VOICE.to_string())]
        );
    }

    #[tokio::test]
    async fn missing_output_is_an_error() {
        let (_dir, store) = store();
        let synth = SpeechSynthesizer::new(Arc::new(SilentEngine), store);

        assert!(matches!(
            synth.synthesize("hola", MALE_VOICE).await,
            Err(Error::Tts(_))
        ));
    }

    #[tokio::test]
    async fn empty_text_never_reaches_engine() {
        let (_dir, store) = store();
        let engine = Arc::new(WritingEngine {
            seen: Mutex::new(Vec::new()),
        });
        let synth = SpeechSynthesizer::new(engine.clone(), store);

        assert!(synth.synthesize("🍺🍺", MALE_VOICE).await.is_err());
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_discards_partial_output() {
        let (_dir, store) = store();
        let synth = SpeechSynthesizer::new(Arc::new(SlowEngine), store.clone())
            .with_timeout(Duration::from_millis(50));

        let err = synth.synthesize("hola", MALE_VOICE).await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(std::fs::read_dir(store.audio_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_binary_is_a_tts_error() {
        let (_dir, store) = store();
        let engine = EdgeTts::new("/nonexistent/edge-tts-binary");
        let synth = SpeechSynthesizer::new(Arc::new(engine), store);

        assert!(matches!(
            synth.synthesize("hola", MALE_VOICE).await,
            Err(Error::Tts(_))
        ));
    }
}
