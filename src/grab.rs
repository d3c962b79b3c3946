use crate::preview::PreviewSurface;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, GenericImage, ImageFormat, RgbImage};

/// JPEG quality for stills, the encoder's maximum
pub const JPEG_QUALITY: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum GrabError {
    #[error("preview is not ready: {0}")]
    PreviewNotReady(&'static str),

    #[error("failed to copy frame into bitmap: {0}")]
    Copy(#[source] image::ImageError),

    #[error("failed to encode still: {0}")]
    Encode(#[source] image::ImageError),

    #[error("failed to decode still: {0}")]
    Decode(#[source] image::ImageError),
}

/// An encoded still image
#[derive(Debug, Clone)]
pub struct CapturedImage {
    data: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Self-contained `data:` URL suitable for inline display
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.to_mime_type(),
            STANDARD.encode(&self.data)
        )
    }

    /// Decode the payload back into a raster
    pub fn decode(&self) -> Result<RgbImage, GrabError> {
        let decoded = image::load_from_memory_with_format(&self.data, self.format)
            .map_err(GrabError::Decode)?;
        Ok(decoded.to_rgb8())
    }
}

/// Takes single-frame snapshots from a preview surface
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameGrabber;

impl FrameGrabber {
    pub fn new() -> Self {
        Self
    }

    pub fn grab(&self, surface: &PreviewSurface) -> Result<CapturedImage, GrabError> {
        let _span = tracing::debug_span!("grab").entered();

        if !surface.is_playing() {
            return Err(GrabError::PreviewNotReady("playback has not started"));
        }
        let (width, height) = surface
            .intrinsic_size()
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or(GrabError::PreviewNotReady("intrinsic size unknown"))?;
        let frame = surface
            .current_frame()
            .ok_or(GrabError::PreviewNotReady("no frame shown yet"))?;

        // Offscreen bitmap at the intrinsic size; frames of another size are scaled to fill it
        let mut bitmap = RgbImage::new(width, height);
        if frame.dimensions() == (width, height) {
            bitmap.copy_from(frame, 0, 0).map_err(GrabError::Copy)?;
        } else {
            tracing::debug!(
                "Scaling {}x{} frame into {}x{} bitmap",
                frame.width(),
                frame.height(),
                width,
                height
            );
            let scaled = imageops::resize(frame, width, height, imageops::FilterType::Triangle);
            bitmap.copy_from(&scaled, 0, 0).map_err(GrabError::Copy)?;
        }

        let data = encode_jpeg(&bitmap)?;
        tracing::debug!("Encoded {}x{} still: {} bytes", width, height, data.len());

        Ok(CapturedImage {
            data,
            format: ImageFormat::Jpeg,
            width,
            height,
        })
    }
}

fn encode_jpeg(bitmap: &RgbImage) -> Result<Vec<u8>, GrabError> {
    let _span = tracing::debug_span!("encode").entered();
    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY)
        .encode_image(bitmap)
        .map_err(GrabError::Encode)?;
    Ok(data)
}
