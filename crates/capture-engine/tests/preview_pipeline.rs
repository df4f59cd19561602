mod support;

use std::sync::Arc;
use std::time::Duration;

use scenecast_capture_engine::{PreviewConfig, PreviewPipeline, PreviewSurface, RecordingStatus};
use scenecast_scene_model::{SceneBook, SceneStore};

use support::*;

#[test]
fn preview_streams_latest_composite_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let config = PreviewConfig::from_app(&test_config(dir.path()));
    let store = Arc::new(SceneStore::new(SceneBook::default()));
    let backends = Arc::new(FakeBackends::default());

    let mut preview = PreviewPipeline::start(
        config.clone(),
        store,
        backends.clone(),
        RecordingStatus::default(),
    )
    .unwrap();
    assert!(preview.is_running());
    assert!(wait_for(Duration::from_secs(2), || preview.frames_produced() >= 3));

    // Several frames were produced but the slot only ever holds one.
    let mut surface = PreviewSurface::new(preview.receiver());
    assert!(wait_for(Duration::from_secs(1), || surface.poll()));
    let frame = surface.current().unwrap();
    assert_eq!(frame.dimensions(), config.canvas);
    // Downscaled from the 160x90 screen grab.
    let center = frame.get_pixel(config.canvas.0 / 2, config.canvas.1 / 2);
    for (got, want) in center.0.iter().zip(SCREEN_COLOR.0) {
        assert!(got.abs_diff(want) <= 1, "{center:?}");
    }

    preview.stop();
    assert!(!preview.is_running());
    let produced = preview.frames_produced();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(preview.frames_produced(), produced);
    assert!(backends.regions.lock().unwrap().iter().all(Option::is_none));
}
