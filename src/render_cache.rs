use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::render::{RenderError, RenderMode, RenderSink, RenderedImage};

/// The exact markup sequence plus the requested font size.
pub type RenderKey = (Vec<String>, u32);

/// Memoizes rendered images so that re-displaying a hypothesis is free.
///
/// Once typesetting has failed, the cache stays in degraded mode and renders
/// everything afterwards with the fallback mode. Cached images are kept
/// whichever mode produced them.
pub struct RenderCache<S: RenderSink> {
    sink: S,
    images: DashMap<RenderKey, Arc<RenderedImage>>,
    degraded: AtomicBool,
}

impl<S: RenderSink> RenderCache<S> {
    pub fn new(sink: S) -> Self {
        RenderCache {
            sink,
            images: DashMap::new(),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn get(&self, lines: &[String], font_size: u32) -> Option<Arc<RenderedImage>> {
        self.images
            .get(&(lines.to_vec(), font_size))
            .map(|entry| entry.value().clone())
    }

    /// Returns the cached image, rendering it first if needed.
    pub fn render(&self, lines: &[String], font_size: u32) -> Result<Arc<RenderedImage>, RenderError> {
        if let Some(image) = self.get(lines, font_size) {
            return Ok(image);
        }

        debug!(lines = lines.len(), font_size, "rendering hypothesis");
        let image = match self.render_uncached(lines, font_size) {
            Ok(image) => image,
            Err(e) => {
                warn!("{}", e);
                return Err(e);
            }
        };

        // Another thread may have rendered the same key meanwhile.
        // Whichever insert lands first is the one everybody shares.
        let entry = self
            .images
            .entry((lines.to_vec(), font_size))
            .or_insert_with(|| Arc::new(image));
        Ok(entry.value().clone())
    }

    fn render_uncached(&self, lines: &[String], font_size: u32) -> Result<RenderedImage, RenderError> {
        if self.is_degraded() {
            return self.sink.render(lines, font_size, RenderMode::Fallback);
        }
        match self.sink.render(lines, font_size, RenderMode::Typeset) {
            Ok(image) => Ok(image),
            Err(e) => {
                warn!("{}. Falling back to plain rendering.", e);
                self.degraded.store(true, Ordering::SeqCst);
                self.sink.render(lines, font_size, RenderMode::Fallback)
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&self) {
        self.images.clear();
    }
}
