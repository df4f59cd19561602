//! Native capture backends.
//!
//! Backends are thread-affine: the preview and recording workers each ask
//! the shared factory for their own instance. Construction goes through a
//! process-wide lock because some native capture libraries keep global
//! state during session setup; captures themselves run unlocked.

use std::sync::{Arc, Mutex, PoisonError};

use scenecast_common::error::ScenecastResult;
use scenecast_platform_core::{BackendFactory, CaptureBackend, WindowProvider};

pub mod camera;
pub mod desktop;

pub use camera::GstCameraStream;
pub use desktop::{NativeBackend, NativeBackendFactory, NativeWindowProvider};

static CREATION_LOCK: Mutex<()> = Mutex::new(());

/// Factory wrapper that serializes backend construction process-wide.
pub struct SerializedFactory<F> {
    inner: F,
}

impl<F: BackendFactory> SerializedFactory<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: BackendFactory> BackendFactory for SerializedFactory<F> {
    fn create(&self) -> ScenecastResult<Box<dyn CaptureBackend>> {
        let _guard = CREATION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.create()
    }
}

/// The platform backend factory, construction serialized.
pub fn native_backend_factory() -> Arc<dyn BackendFactory> {
    Arc::new(SerializedFactory::new(NativeBackendFactory))
}

/// The platform window provider.
pub fn native_window_provider() -> Arc<dyn WindowProvider> {
    Arc::new(NativeWindowProvider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenecast_common::error::ScenecastError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowFactory {
        active: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl BackendFactory for SlowFactory {
        fn create(&self) -> ScenecastResult<Box<dyn CaptureBackend>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Err(ScenecastError::capture("test factory"))
        }
    }

    #[test]
    fn construction_is_serialized() {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(SerializedFactory::new(SlowFactory {
            active: Arc::new(AtomicUsize::new(0)),
            max_seen: max_seen.clone(),
        }));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let factory = factory.clone();
                std::thread::spawn(move || factory.create().is_err())
            })
            .collect();
        for worker in workers {
            assert!(worker.join().unwrap());
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
