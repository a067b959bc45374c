//! Tests drive the engine through stub shell scripts substituted via the
//! command override environment variable, so none of them need a real
//! espeak installation.

#[cfg(test)]
mod tests {
    use crate::{EspeakEngine, ESPEAK_COMMAND_ENV};
    use papervox_tts::{SynthesisOptions, TtsConfig, TtsEngine, TtsError};
    use serial_test::serial;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: String) -> Self {
            let previous = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn write_stub(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("espeak_stub.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn stub_engine(dir: &TempDir, body: &str) -> (EspeakEngine, EnvGuard) {
        let stub = write_stub(dir, body);
        let guard = EnvGuard::set(ESPEAK_COMMAND_ENV, stub.display().to_string());
        let mut engine = EspeakEngine::new();
        engine.initialize(TtsConfig::default()).unwrap();
        (engine, guard)
    }

    #[test]
    fn engine_identity() {
        let engine = EspeakEngine::new();
        assert_eq!(engine.name(), "espeak");
    }

    #[test]
    fn speak_before_initialize_is_rejected() {
        let mut engine = EspeakEngine::new();
        let err = engine
            .speak("hello", &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, TtsError::InitializationError(_)));
    }

    #[test]
    #[serial]
    fn speak_passes_text_and_rate_to_the_command() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("args.log");
        let (mut engine, _guard) = stub_engine(
            &dir,
            &format!("printf '%s\\n' \"$@\" > {}", log.display()),
        );

        engine
            .speak("hello world", &SynthesisOptions::default())
            .unwrap();

        let logged = fs::read_to_string(&log).unwrap();
        let args: Vec<&str> = logged.lines().collect();
        assert!(args.contains(&"-s"));
        assert!(args.contains(&"180"));
        assert_eq!(*args.last().unwrap(), "hello world");
    }

    #[test]
    #[serial]
    fn synthesize_writes_the_requested_file() {
        let dir = TempDir::new().unwrap();
        // The stub mimics `espeak -w <file>`: it writes to the arg after -w.
        let (mut engine, _guard) = stub_engine(
            &dir,
            r#"out=""
while [ $# -gt 1 ]; do
  if [ "$1" = "-w" ]; then out="$2"; fi
  shift
done
[ -n "$out" ] && printf 'RIFF' > "$out""#,
        );

        let output = dir.path().join("nested").join("speech.wav");
        engine
            .synthesize_to_file("hello", &output, &SynthesisOptions::default())
            .unwrap();
        assert!(output.exists());
    }

    #[test]
    #[serial]
    fn nonzero_exit_surfaces_stderr() {
        let dir = TempDir::new().unwrap();
        let (mut engine, _guard) = stub_engine(&dir, "echo 'no audio device' >&2; exit 3");

        let err = engine
            .speak("hello", &SynthesisOptions::default())
            .unwrap_err();
        match err {
            TtsError::SynthesisError(message) => {
                assert!(message.contains("status 3"));
                assert!(message.contains("no audio device"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn missing_binary_reports_engine_not_available() {
        let _guard = EnvGuard::set(ESPEAK_COMMAND_ENV, "/nonexistent/espeak-binary".into());
        let mut engine = EspeakEngine::new();
        engine.initialize(TtsConfig::default()).unwrap();
        let err = engine
            .speak("hello", &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, TtsError::Io(_)));
    }

    #[test]
    #[serial]
    fn voices_are_parsed_from_listing_output() {
        let dir = TempDir::new().unwrap();
        let (mut engine, _guard) = stub_engine(
            &dir,
            r#"if [ "$1" = "--voices" ]; then
  echo 'Pty Language Age/Gender VoiceName          File          Other Languages'
  echo ' 5  en             M  english              en            (en-uk 2)'
  echo ' 5  es             F  spanish              europe/es'
fi"#,
        );
        engine.initialize(TtsConfig::default()).unwrap();

        let voices = engine.list_voices().unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "english");
        assert_eq!(voices[1].language, "es");

        engine.set_voice("spanish").unwrap();
        let err = engine.set_voice("martian").unwrap_err();
        assert!(matches!(err, TtsError::VoiceNotFound(_)));
    }

    #[test]
    fn empty_text_is_invalid_input() {
        let mut engine = EspeakEngine::new();
        engine.is_initialized = true;
        let err = engine
            .speak("   ", &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, TtsError::InvalidInput(_)));
    }
}
