mod common;

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{listen_response, StubServer};
use revoice::config::{SynthesisConfig, TranscriptionConfig};
use revoice::{
    ApiKey, AudioArtifact, AudioFetcher, Config, Credentials, DeepgramTranscriber, ElevenLabsSynthesizer,
    FetchError, Pipeline, PipelineError, Stage, SynthesisError, Synthesizer, Transcriber, TranscriptionError,
};

/// Fetcher that hands back a file prepared by the test
struct StubFetcher {
    result: Option<PathBuf>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<AudioArtifact, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(path) => Ok(AudioArtifact {
                path: path.clone(),
                title: "clip".to_string(),
                duration: None,
                source_url: url.to_string(),
            }),
            None => Err(FetchError::Download {
                url: url.to_string(),
                message: "ERROR: Unsupported URL".to_string(),
            }),
        }
    }
}

fn transcriber(server: &StubServer) -> DeepgramTranscriber {
    let config = TranscriptionConfig {
        endpoint: format!("{}/v1/listen", server.url),
        ..Default::default()
    };
    DeepgramTranscriber::new(Client::new(), &config, ApiKey::new("dg_test")).unwrap()
}

fn synthesizer(server: &StubServer, output: &Path) -> ElevenLabsSynthesizer {
    let config = SynthesisConfig {
        endpoint: format!("{}/v1/text-to-speech", server.url),
        ..Default::default()
    };
    ElevenLabsSynthesizer::new(Client::new(), config, ApiKey::new("sk_test"), output).unwrap()
}

fn write_clip(dir: &Path) -> PathBuf {
    let clip = dir.join("clip.mp3");
    std::fs::write(&clip, b"ID3\x03\x00fake-mp3-frames").unwrap();
    clip
}

#[tokio::test]
async fn test_end_to_end_run_writes_synthesized_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());
    let output = dir.path().join("output_speech.mp3");

    let listen = StubServer::start(200, listen_response("hello world")).await;
    let tts = StubServer::start(200, vec![0x00u8, 0x01]).await;

    let pipeline = Pipeline::new(
        Box::new(StubFetcher {
            result: Some(clip.clone()),
            calls: Arc::default(),
        }),
        Box::new(transcriber(&listen)),
        Box::new(synthesizer(&tts, &output)),
    );

    let result = pipeline.run("https://youtu.be/abc").await.unwrap();

    assert_eq!(result.speech_path(), &output);
    assert_eq!(result.transcript, "hello world");
    assert_eq!(result.speech.bytes, 2);
    assert_eq!(std::fs::read(&output).unwrap(), vec![0x00u8, 0x01]);

    let uploads = listen.requests();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].method, "POST");
    assert_eq!(uploads[0].path, "/v1/listen");
    assert_eq!(uploads[0].header("authorization"), Some("Token dg_test"));
    assert_eq!(uploads[0].header("content-type"), Some("audio/mp3"));
    assert_eq!(uploads[0].body, std::fs::read(&clip).unwrap());

    let speech_requests = tts.requests();
    assert_eq!(speech_requests.len(), 1);
    assert_eq!(speech_requests[0].method, "POST");
    assert_eq!(speech_requests[0].path, "/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM");
    assert_eq!(speech_requests[0].header("xi-api-key"), Some("sk_test"));
    assert_eq!(speech_requests[0].header("content-type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_slice(&speech_requests[0].body).unwrap();
    assert_eq!(body["text"], "hello world");
    assert_eq!(body["model_id"], "eleven_monolingual_v1");
    assert_eq!(body["voice_settings"]["stability"], 0.5);
    assert_eq!(body["voice_settings"]["similarity_boost"], 0.5);
}

#[tokio::test]
async fn test_unauthorized_transcription_stops_before_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());
    let output = dir.path().join("output_speech.mp3");

    let listen = StubServer::start(401, r#"{"err_code":"INVALID_AUTH","err_msg":"Invalid credentials."}"#).await;
    let tts = StubServer::start(200, vec![0x00u8, 0x01]).await;

    let pipeline = Pipeline::new(
        Box::new(StubFetcher {
            result: Some(clip),
            calls: Arc::default(),
        }),
        Box::new(transcriber(&listen)),
        Box::new(synthesizer(&tts, &output)),
    );

    let err = pipeline.run("https://youtu.be/abc").await.unwrap_err();

    assert_eq!(err.stage(), Stage::Transcribe);
    match err {
        PipelineError::Transcription(TranscriptionError::Api { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("INVALID_AUTH"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(listen.requests().len(), 1);
    assert!(tts.requests().is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_fetch_failure_makes_no_service_requests() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output_speech.mp3");

    let listen = StubServer::start(200, listen_response("unused")).await;
    let tts = StubServer::start(200, vec![0x00u8]).await;
    let calls = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new(
        Box::new(StubFetcher {
            result: None,
            calls: calls.clone(),
        }),
        Box::new(transcriber(&listen)),
        Box::new(synthesizer(&tts, &output)),
    );

    let err = pipeline.run("https://example.com/not-a-video").await.unwrap_err();

    assert_eq!(err.stage(), Stage::Fetch);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(listen.requests().is_empty());
    assert!(tts.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_transcription_response() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());

    let listen = StubServer::start(200, r#"{"results":{"channels":[]}}"#).await;
    let err = transcriber(&listen).transcribe(&clip).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::MalformedResponse { .. }));
    assert_eq!(listen.requests().len(), 1);
}

#[tokio::test]
async fn test_transcription_server_error_includes_body() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());

    let listen = StubServer::start(503, "upstream unavailable").await;
    let err = transcriber(&listen).transcribe(&clip).await.unwrap_err();

    assert_eq!(err.to_string(), "Deepgram API error: 503 - upstream unavailable");
}

#[tokio::test]
async fn test_synthesis_is_byte_exact_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("speech").join("output_speech.mp3");
    let audio: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    let tts = StubServer::start(200, audio.clone()).await;
    let synth = synthesizer(&tts, &output);

    let first = synth.synthesize("hello world").await.unwrap();
    let second = synth.synthesize("hello world").await.unwrap();

    assert_eq!(first.path, output);
    assert_eq!(second.path, output);
    assert_eq!(second.bytes, audio.len() as u64);
    assert_eq!(std::fs::read(&output).unwrap(), audio);
    assert_eq!(std::fs::read_dir(output.parent().unwrap()).unwrap().count(), 1);
    assert_eq!(tts.requests().len(), 2);
}

#[tokio::test]
async fn test_synthesis_error_reports_status_and_body() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output_speech.mp3");

    let tts = StubServer::start(401, r#"{"detail":{"status":"invalid_api_key"}}"#).await;
    let err = synthesizer(&tts, &output).synthesize("hello").await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Eleven Labs API error: 401"));
    assert!(message.contains("invalid_api_key"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_request_timeout_bounds_unresponsive_transcription() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());

    let listen = StubServer::start_silent().await;
    let tts = StubServer::start(200, vec![0x00u8, 0x01]).await;

    let mut config = Config::default();
    config.transcription.endpoint = format!("{}/v1/listen", listen.url);
    config.synthesis.endpoint = format!("{}/v1/text-to-speech", tts.url);
    config.app.output_dir = Some(dir.path().to_path_buf());
    config.app.request_timeout_secs = Some(1);
    let credentials = Credentials::new(ApiKey::new("dg_test"), ApiKey::new("sk_test"));

    let pipeline = Pipeline::from_config(&config, &credentials)
        .unwrap()
        .with_fetcher(Box::new(StubFetcher {
            result: Some(clip),
            calls: Arc::default(),
        }));

    let started = Instant::now();
    let err = pipeline.run("https://youtu.be/abc").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        matches!(&err, PipelineError::Transcription(TranscriptionError::Request(e)) if e.is_timeout()),
        "expected a request timeout, got {err:?}"
    );
    assert!(elapsed >= Duration::from_millis(900), "gave up too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "timeout not applied: {elapsed:?}");
    assert_eq!(listen.requests().len(), 1);
    assert!(tts.requests().is_empty());
    assert!(!config.speech_output_path().exists());
}

#[tokio::test]
async fn test_error_status_survives_unreadable_body() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_clip(dir.path());
    let output = dir.path().join("output_speech.mp3");

    let listen = StubServer::start_truncated(500, "partial", 4096).await;
    let err = transcriber(&listen).transcribe(&clip).await.unwrap_err();
    match err {
        TranscriptionError::Api { status, .. } => assert_eq!(status, 500),
        other => panic!("expected an API error, got {other:?}"),
    }

    let tts = StubServer::start_truncated(500, "partial", 4096).await;
    let err = synthesizer(&tts, &output).synthesize("hello").await.unwrap_err();
    match err {
        SynthesisError::Api { status, .. } => assert_eq!(status, 500),
        other => panic!("expected an API error, got {other:?}"),
    }
    assert!(!output.exists());
}
