mod loopback;
mod overlay;

pub use loopback::LoopbackSink;
pub use overlay::GuideOverlay;

use crate::capture::MediaStream;
use anyhow::{Context, Result};
use image::RgbImage;

/// Trait for display destinations of preview frames and stills
pub trait PreviewSink {
    /// Show a frame
    fn show_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Remove whatever is currently shown
    fn clear(&mut self) -> Result<()>;
}

/// Sink used when no display device is configured: frames are only logged
#[derive(Debug, Default)]
pub struct LogSink {
    frames: u64,
}

impl PreviewSink for LogSink {
    fn show_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames += 1;
        if self.frames % 30 == 1 {
            let (width, height) = frame.dimensions();
            tracing::debug!("Display frame {}: {}x{}", self.frames, width, height);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        tracing::debug!("Display cleared");
        Ok(())
    }
}

/// Live-video target bound to a camera stream.
///
/// The surface learns its intrinsic size from the first frame the stream
/// delivers ("metadata loaded") and only starts playing after that.
pub struct PreviewSurface {
    stream: Box<dyn MediaStream>,
    overlay: GuideOverlay,
    intrinsic: Option<(u32, u32)>,
    playing: bool,
    current: Option<RgbImage>,
}

impl PreviewSurface {
    pub fn bind(stream: Box<dyn MediaStream>) -> Self {
        let (width, height) = stream.resolution();
        tracing::debug!("Preview bound to {}x{} stream", width, height);
        Self {
            stream,
            overlay: GuideOverlay::default(),
            intrinsic: None,
            playing: false,
            current: None,
        }
    }

    /// Intrinsic frame size, known once metadata has loaded
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        self.intrinsic
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// The most recent frame shown, without the guide overlay
    pub fn current_frame(&self) -> Option<&RgbImage> {
        self.current.as_ref()
    }

    /// Pull the next frame from the stream and show it with the guide
    pub fn refresh(&mut self, sink: &mut dyn PreviewSink) -> Result<()> {
        anyhow::ensure!(self.stream.is_live(), "Preview stream is not live");

        let frame = self
            .stream
            .capture_frame()
            .context("Failed to read preview frame")?;

        if self.intrinsic.is_none() {
            let (width, height) = frame.dimensions();
            if width == 0 || height == 0 {
                tracing::debug!("Stream delivered an empty frame, waiting for metadata");
                return Ok(());
            }
            self.on_metadata_loaded(width, height);
        }

        if !self.playing {
            return Ok(());
        }

        let mut shown = frame.clone();
        self.overlay.apply(&mut shown);
        self.current = Some(frame);
        sink.show_frame(&shown).context("Failed to show preview frame")
    }

    fn on_metadata_loaded(&mut self, width: u32, height: u32) {
        tracing::info!("Preview metadata loaded: {}x{}", width, height);
        self.intrinsic = Some((width, height));
        self.playing = true;
    }

    /// Stop every track of the bound stream and stop playback
    pub(crate) fn stop_stream(&mut self) {
        self.playing = false;
        self.stream.stop();
    }

    pub(crate) fn stream_is_live(&self) -> bool {
        self.stream.is_live()
    }
}
