mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::Rgba;

use scenecast_capture_engine::output::sidecar_audio_path;
use scenecast_capture_engine::{AudioFormat, RecordingConfig, RecordingSession, RecordingState};
use scenecast_scene_model::{SceneBook, SceneStore, SourceKind};

use support::*;

fn session_with(
    dir: &std::path::Path,
    sinks: Arc<RecordingSinks>,
    audio: BurstInput,
) -> (RecordingSession, Arc<SceneStore>) {
    let config = test_config(dir);
    let store = Arc::new(SceneStore::new(SceneBook::default()));
    let session = RecordingSession::new(
        RecordingConfig::from_app(&config),
        store.clone(),
        Arc::new(FakeBackends::default()),
        sinks,
        Arc::new(audio),
    );
    (session, store)
}

#[test]
fn paused_time_is_excluded_from_output() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::default());
    let (mut session, _store) = session_with(dir.path(), sinks.clone(), BurstInput::new(0));

    let wall = Instant::now();
    let path = session.start().unwrap();
    assert_eq!(session.state(), RecordingState::Recording);
    assert_eq!(session.output_path(), Some(path.as_path()));
    std::thread::sleep(Duration::from_millis(300));

    session.pause().unwrap();
    assert_eq!(session.state(), RecordingState::Paused);
    std::thread::sleep(Duration::from_millis(50));
    let frames_at_pause = session.frames_written();
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(session.frames_written(), frames_at_pause, "no frames while paused");

    session.resume().unwrap();
    std::thread::sleep(Duration::from_millis(300));
    let summary = session.stop().unwrap();
    let wall = wall.elapsed();

    assert_eq!(session.state(), RecordingState::Idle);
    assert_eq!(summary.video_path, path);
    assert!(summary.audio_path.is_none());
    assert!(summary.elapsed >= Duration::from_millis(550), "{:?}", summary.elapsed);
    assert!(summary.elapsed + Duration::from_millis(300) <= wall, "{:?} vs {wall:?}", summary.elapsed);

    let video = sinks.video(0);
    let video = video.lock().unwrap();
    assert!(video.finished);
    assert_eq!(video.pts.len() as u64, summary.frames_written);
    assert!(summary.frames_written >= 10, "{} frames", summary.frames_written);
    // One frame per period of active time; the paused stretch adds none.
    let expected = summary.elapsed.as_secs_f64() * 30.0;
    assert!(
        (summary.frames_written as f64 - expected).abs() <= 1.0,
        "{} frames for {:?} active",
        summary.frames_written,
        summary.elapsed
    );

    // Presentation times are contiguous frame periods: the pause leaves no gap.
    let period = Duration::from_secs(1) / 30;
    for (i, pts) in video.pts.iter().enumerate() {
        assert_eq!(*pts, Duration::from_nanos(period.as_nanos() as u64 * i as u64));
    }
    let last = *video.pts.last().unwrap();
    assert!(last <= summary.elapsed + period);

    let frame = video.last_frame.as_ref().unwrap();
    assert_eq!(frame.dimensions(), (160, 90));
    assert_eq!(*frame.get_pixel(80, 45), SCREEN_COLOR);
}

#[test]
fn video_open_failure_leaves_session_idle() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::failing_video());
    let (mut session, _store) = session_with(dir.path(), sinks, BurstInput::new(0));

    assert!(session.start().is_err());
    assert_eq!(session.state(), RecordingState::Idle);
    assert!(session.output_path().is_none());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn audio_sink_failure_removes_the_video_file() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::failing_audio());
    let (mut session, store) = session_with(dir.path(), sinks.clone(), BurstInput::new(16));
    store.update_active(|scene| scene.audio_enabled = true);

    assert!(session.start().is_err());
    assert_eq!(session.state(), RecordingState::Idle);
    assert_eq!(sinks.videos.lock().unwrap().len(), 1);
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn missing_audio_device_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::default());
    let (mut session, store) = session_with(dir.path(), sinks, BurstInput::unavailable());
    store.update_active(|scene| scene.audio_enabled = true);

    assert!(session.start().is_err());
    assert_eq!(session.state(), RecordingState::Idle);
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn audio_is_written_beside_the_video() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::default());
    let (mut session, store) = session_with(dir.path(), sinks.clone(), BurstInput::new(4410));
    store.update_active(|scene| scene.audio_enabled = true);

    let path = session.start().unwrap();
    assert!(wait_for(Duration::from_secs(2), || session.frames_written() > 2));
    let summary = session.stop().unwrap();

    assert_eq!(summary.audio_path, Some(sidecar_audio_path(&path)));
    let audio = sinks.audio(0);
    let audio = audio.lock().unwrap();
    assert!(audio.finished);
    assert_eq!(audio.samples.len(), 4410);
    assert_eq!(
        audio.format,
        Some(AudioFormat {
            sample_rate: 44_100,
            channels: 2
        })
    );
    assert_eq!(files_in(dir.path()).len(), 2);
}

#[test]
fn scene_edits_reach_a_running_recording() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::default());
    let (mut session, store) = session_with(dir.path(), sinks.clone(), BurstInput::new(0));

    session.start().unwrap();
    let video = sinks.video(0);
    let corner = |want: Rgba<u8>| {
        video
            .lock()
            .unwrap()
            .last_frame
            .as_ref()
            .is_some_and(|f| *f.get_pixel(2, 80) == want)
    };
    assert!(wait_for(Duration::from_secs(2), || corner(SCREEN_COLOR)));

    // A window source with nothing picked renders a black placeholder.
    store.update_active(|scene| scene.select_source(SourceKind::Window));
    assert!(wait_for(Duration::from_secs(2), || corner(Rgba([0, 0, 0, 255]))));

    session.stop().unwrap();
}

#[test]
fn rejected_frames_are_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::rejecting_frames());
    let (mut session, _store) = session_with(dir.path(), sinks.clone(), BurstInput::new(0));

    session.start().unwrap();
    let video = sinks.video(0);
    assert!(wait_for(Duration::from_secs(2), || video.lock().unwrap().rejected >= 5));
    assert_eq!(session.state(), RecordingState::Recording);
    assert_eq!(session.frames_written(), 0);

    let summary = session.stop().unwrap();
    assert_eq!(summary.frames_written, 0);
    assert_eq!(session.state(), RecordingState::Idle);
    let video = video.lock().unwrap();
    assert!(video.finished);
    assert!(video.pts.is_empty());
}

#[test]
fn transitions_are_checked() {
    let dir = tempfile::tempdir().unwrap();
    let sinks = Arc::new(RecordingSinks::default());
    let (mut session, _store) = session_with(dir.path(), sinks, BurstInput::new(0));

    assert!(session.pause().is_err());
    assert!(session.resume().is_err());
    assert!(session.stop().is_err());

    session.start().unwrap();
    assert!(session.start().is_err());
    assert!(session.resume().is_err());
    session.pause().unwrap();
    assert!(session.pause().is_err());
    session.stop().unwrap();
    assert_eq!(session.state(), RecordingState::Idle);
    assert_eq!(session.elapsed(), Duration::ZERO);
}
