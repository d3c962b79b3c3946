use crate::capture::{CameraAccess, CameraError, StreamConstraints};
use crate::preview::PreviewSurface;

/// Exclusive handle to a live camera stream and the preview it feeds.
///
/// Dropping the session releases it, so the camera is stopped on every path
/// out of previewing, not only after a capture.
pub struct MediaSession {
    surface: PreviewSurface,
    released: bool,
}

impl MediaSession {
    fn new(surface: PreviewSurface) -> Self {
        Self {
            surface,
            released: false,
        }
    }

    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut PreviewSurface {
        &mut self.surface
    }

    #[cfg(test)]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track of the stream. Calling this again is a no-op.
    pub fn release(&mut self) {
        if self.released {
            tracing::debug!("Media session already released");
            return;
        }
        self.surface.stop_stream();
        self.released = true;
        tracing::info!("Camera released");
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out [`MediaSession`]s from a camera backend
pub struct MediaSessionManager<A> {
    access: A,
}

impl<A: CameraAccess> MediaSessionManager<A> {
    pub fn new(access: A) -> Self {
        Self { access }
    }

    /// Request a stream and bind it to a new preview surface.
    ///
    /// Playback starts later, once the surface has seen its first frame.
    pub fn acquire(&mut self, constraints: &StreamConstraints) -> Result<MediaSession, CameraError> {
        let stream = self.access.request_stream(constraints)?;
        let surface = PreviewSurface::bind(stream);
        debug_assert!(surface.stream_is_live());
        Ok(MediaSession::new(surface))
    }

    pub fn release(&self, session: &mut MediaSession) {
        session.release();
    }
}
