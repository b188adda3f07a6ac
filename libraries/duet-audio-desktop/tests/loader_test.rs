//! Background loading: fetch, decode and resample off the caller's thread
//!
//! Plain `#[test]`s so the loader's owned runtime is never dropped inside
//! another runtime.

mod common;

use common::{temp_file, wav_bytes};
use crossbeam_channel::{bounded, Receiver};
use duet_audio::SymphoniaDecoder;
use duet_audio_desktop::{FetchSettings, LocalFetcher, ResamplingQuality, SourceFetcher, ThreadedLoader};
use duet_core::DecodedAudio;
use duet_playback::{MediaLoader, PlaybackError};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type LoadResult = Result<DecodedAudio, PlaybackError>;

fn local_loader() -> ThreadedLoader {
    ThreadedLoader::new(Arc::new(LocalFetcher), Arc::new(SymphoniaDecoder::new())).unwrap()
}

fn start(loader: &ThreadedLoader, locator: &str) -> Receiver<LoadResult> {
    let (tx, rx) = bounded(1);
    loader.load(
        locator,
        Box::new(move |result| {
            let _ = tx.send(result);
        }),
    );
    rx
}

fn wait(rx: &Receiver<LoadResult>) -> LoadResult {
    rx.recv_timeout(Duration::from_secs(10))
        .expect("loader never called back")
}

#[test]
fn decodes_local_wav() {
    let (_dir, path) = temp_file("take.wav", &wav_bytes(8_000, 4_000, 8_192));

    let audio = wait(&start(&local_loader(), path.to_str().unwrap())).unwrap();

    assert_eq!(audio.sample_rate(), 8_000);
    assert_eq!(audio.frames(), 4_000);
    assert!((audio.duration_secs() - 0.5).abs() < 1e-6);
}

#[test]
fn callback_runs_off_the_calling_thread() {
    let (_dir, path) = temp_file("take.wav", &wav_bytes(8_000, 100, 0));
    let loader = local_loader();
    let caller = std::thread::current().id();

    let (tx, rx) = bounded(1);
    loader.load(
        path.to_str().unwrap(),
        Box::new(move |_| {
            let _ = tx.send(std::thread::current().id());
        }),
    );

    let callback_thread = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_ne!(callback_thread, caller);
}

#[test]
fn resamples_to_device_rate() {
    let (_dir, path) = temp_file("take.wav", &wav_bytes(8_000, 8_000, 8_192));
    let loader = local_loader().with_target_rate(16_000, ResamplingQuality::Fast);

    let audio = wait(&start(&loader, path.to_str().unwrap())).unwrap();

    assert_eq!(audio.sample_rate(), 16_000);
    assert!((audio.duration_secs() - 1.0).abs() < 0.001);
}

#[test]
fn missing_file_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.wav");

    let err = wait(&start(&local_loader(), missing.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, PlaybackError::Fetch(_)), "got {err:?}");
}

#[test]
fn garbage_is_a_decode_error() {
    let (_dir, path) = temp_file("noise.mp3", b"this is not an mp3 file at all");

    let err = wait(&start(&local_loader(), path.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, PlaybackError::Decode(_)), "got {err:?}");
}

#[test]
fn loads_over_http_on_shared_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mock_server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/tracks/take-2.wav"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(wav_bytes(8_000, 800, 100)))
            .mount(&mock_server),
    );

    let fetcher = SourceFetcher::new(&FetchSettings::default()).unwrap();
    let loader = ThreadedLoader::with_handle(
        runtime.handle().clone(),
        Arc::new(fetcher),
        Arc::new(SymphoniaDecoder::new()),
    );

    let url = format!("{}/tracks/take-2.wav", mock_server.uri());
    let audio = wait(&start(&loader, &url)).unwrap();
    assert_eq!(audio.frames(), 800);
}
