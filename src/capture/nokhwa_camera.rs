use super::{CameraAccess, CameraError, FacingMode, MediaStream, StreamConstraints};
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraInfo, FrameFormat, RequestedFormat,
    RequestedFormatType, Resolution,
};
use nokhwa::{Camera, NokhwaError};

const PREFERRED_FPS: u32 = 30;

/// Camera access backed by the platform's native capture API
pub struct NokhwaAccess {
    backend: ApiBackend,
}

impl NokhwaAccess {
    pub fn new() -> Self {
        Self {
            backend: ApiBackend::Auto,
        }
    }

    /// Pick the device whose label best fits the requested facing
    fn select_device(&self, facing: FacingMode) -> Result<CameraInfo, CameraError> {
        let devices = nokhwa::query(self.backend).map_err(classify)?;
        for device in &devices {
            tracing::debug!("Found camera {}: {}", device.index(), device.human_name());
        }

        let labels: Vec<String> = devices.iter().map(|device| device.human_name()).collect();
        let pos = facing.pick_device(&labels).ok_or(CameraError::NotFound)?;
        tracing::debug!("Selected camera {} for {:?} facing", labels[pos], facing);
        Ok(devices[pos].clone())
    }
}

impl Default for NokhwaAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraAccess for NokhwaAccess {
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        let device = self.select_device(constraints.facing)?;
        tracing::info!(
            "Opening camera \"{}\" (ideal {}x{})",
            device.human_name(),
            constraints.ideal_width,
            constraints.ideal_height
        );

        let ideal = CameraFormat::new(
            Resolution::new(constraints.ideal_width, constraints.ideal_height),
            FrameFormat::MJPEG,
            PREFERRED_FPS,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(ideal));

        let mut camera = Camera::new(device.index().clone(), requested).map_err(classify)?;
        camera.open_stream().map_err(classify)?;

        let resolution = camera.resolution();
        tracing::info!(
            "Camera stream open at {}x{}",
            resolution.width(),
            resolution.height()
        );

        Ok(Box::new(NokhwaStream { camera, live: true }))
    }
}

/// Map a backend failure onto the single "camera unavailable" error kind
fn classify(err: NokhwaError) -> CameraError {
    let detail = err.to_string();
    let lower = detail.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        return CameraError::PermissionDenied(detail);
    }
    if lower.contains("no such device") || lower.contains("not found") {
        return CameraError::NotFound;
    }
    match err {
        NokhwaError::SetPropertyError { .. } | NokhwaError::GetPropertyError { .. } => {
            CameraError::Overconstrained(detail)
        }
        _ => CameraError::Backend(detail),
    }
}

struct NokhwaStream {
    camera: Camera,
    live: bool,
}

impl MediaStream for NokhwaStream {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        anyhow::ensure!(self.live, "Camera stream has been stopped");

        let frame = self
            .camera
            .frame()
            .context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        Ok(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop camera stream cleanly: {}", e);
        }
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
