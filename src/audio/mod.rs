//! Narration overlay
//!
//! A low-amplitude synthetic texture (sawtooth tone plus band-passed noise)
//! mixed under the narration. Purely cosmetic: it never carries content and
//! the assistant works without it.

pub mod engine;
pub mod texture;

use crate::error::AldinResult;
use std::sync::Arc;
use tracing::debug;

pub use engine::OverlayEngine;
pub use texture::{OverlayTexture, FADE_IN, FADE_OUT, OVERLAY_GAIN, TEARDOWN_AFTER};

pub type OverlayId = u64;

/// Something that can play the overlay texture
pub trait Overlay: Send + Sync {
    /// Start a new texture instance, faded in
    fn engage(&self) -> AldinResult<OverlayId>;

    /// Fade an instance out and free it
    fn release(&self, id: OverlayId);
}

/// Scoped ownership of one overlay instance; dropping it releases the
/// instance, whichever way the narration ended.
pub struct OverlayGuard {
    overlay: Arc<dyn Overlay>,
    id: OverlayId,
}

impl OverlayGuard {
    pub fn engage(overlay: &Arc<dyn Overlay>) -> AldinResult<Self> {
        let id = overlay.engage()?;
        debug!("🎚️ Overlay {} engaged", id);
        Ok(Self {
            overlay: overlay.clone(),
            id,
        })
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        debug!("🎚️ Overlay {} released", self.id);
        self.overlay.release(self.id);
    }
}

impl std::fmt::Debug for OverlayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingOverlay {
        engaged: Mutex<Vec<OverlayId>>,
        released: Mutex<Vec<OverlayId>>,
    }

    impl Overlay for CountingOverlay {
        fn engage(&self) -> AldinResult<OverlayId> {
            let mut engaged = self.engaged.lock().unwrap();
            let id = engaged.len() as OverlayId + 1;
            engaged.push(id);
            Ok(id)
        }

        fn release(&self, id: OverlayId) {
            self.released.lock().unwrap().push(id);
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let counting = Arc::new(CountingOverlay::default());
        let overlay: Arc<dyn Overlay> = counting.clone();

        let guard = OverlayGuard::engage(&overlay).unwrap();
        assert_eq!(guard.id(), 1);
        assert!(counting.released.lock().unwrap().is_empty());

        drop(guard);
        assert_eq!(*counting.released.lock().unwrap(), vec![1]);
    }
}
