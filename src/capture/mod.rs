mod nokhwa_camera;
#[cfg(test)]
pub mod testing;

pub use nokhwa_camera::NokhwaAccess;

use anyhow::Result;
use image::RgbImage;

/// Ideal capture width requested from the camera
pub const IDEAL_WIDTH: u32 = 1920;
/// Ideal capture height requested from the camera
pub const IDEAL_HEIGHT: u32 = 1080;

/// Which way the requested camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front camera, pointing at the user
    User,
    /// Rear camera, pointing away from the user
    Environment,
}

impl FacingMode {
    /// Name fragments that device labels commonly use for this facing
    pub fn label_hints(&self) -> &'static [&'static str] {
        match self {
            FacingMode::User => &["front", "user", "facetime", "integrated"],
            FacingMode::Environment => &["rear", "back", "environment", "world"],
        }
    }

    pub fn opposite(&self) -> FacingMode {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.label_hints().iter().any(|hint| label.contains(hint))
    }

    /// Index of the device to open for this facing.
    ///
    /// A label match wins; otherwise the first device not labelled for the
    /// opposite facing; otherwise the first device.
    pub fn pick_device<S: AsRef<str>>(&self, labels: &[S]) -> Option<usize> {
        labels
            .iter()
            .position(|label| self.matches(label.as_ref()))
            .or_else(|| {
                let opposite = self.opposite();
                labels
                    .iter()
                    .position(|label| !opposite.matches(label.as_ref()))
            })
            .or((!labels.is_empty()).then_some(0))
    }
}

/// Hints passed to the camera backend when requesting a stream.
///
/// Sizes are ideal values, not exact requirements: the backend picks the
/// closest mode the device offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
            facing: FacingMode::Environment,
        }
    }
}

/// Reasons a camera stream could not be obtained
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera unavailable: permission denied ({0})")]
    PermissionDenied(String),

    #[error("camera unavailable: no camera device found")]
    NotFound,

    #[error("camera unavailable: no mode satisfies the constraints ({0})")]
    Overconstrained(String),

    #[error("camera unavailable: {0}")]
    Backend(String),
}

/// Camera-access API: hands out live streams for a set of constraints
pub trait CameraAccess {
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live camera stream
pub trait MediaStream {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Get the resolution the stream was negotiated at
    fn resolution(&self) -> (u32, u32);

    /// Stop every track of the stream. Frames cannot be read afterwards.
    fn stop(&mut self);

    /// Whether any track is still running
    fn is_live(&self) -> bool;
}
