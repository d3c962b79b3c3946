use super::PreviewSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Raw YUYV frame destination behind a [`LoopbackSink`]
pub trait FrameOutput {
    /// Reconfigure the destination for YUYV frames of the given size
    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<()>;

    /// Write one packed YUYV frame
    fn write_frame(&mut self, yuyv: &[u8]) -> Result<()>;
}

/// A v4l2loopback device: format set via ioctl, frames written to the device file
pub struct V4l2Loopback {
    path: PathBuf,
    device: Device,
    file: File,
}

impl V4l2Loopback {
    pub fn open<P: AsRef<Path>>(device_path: P) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!("Opening v4l2loopback device at {}", path.display());

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            device,
            file,
        })
    }
}

impl FrameOutput for V4l2Loopback {
    fn set_frame_size(&mut self, width: u32, height: u32) -> Result<()> {
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let applied = Output::set_format(&self.device, &requested).with_context(|| {
            format!("Failed to set {}x{} YUYV on {}", width, height, self.path.display())
        })?;
        tracing::debug!(
            "Loopback output configured: {}x{} {}",
            applied.width,
            applied.height,
            applied.fourcc
        );
        Ok(())
    }

    fn write_frame(&mut self, yuyv: &[u8]) -> Result<()> {
        self.file
            .write_all(yuyv)
            .context("Failed to write frame to v4l2loopback device")
    }
}

/// Mirrors preview frames and stills onto a loopback output as YUYV
pub struct LoopbackSink<O = V4l2Loopback> {
    output: O,
    /// Frame size the output is currently configured for
    format: Option<(u32, u32)>,
}

impl LoopbackSink<V4l2Loopback> {
    pub fn open<P: AsRef<Path>>(device_path: P) -> Result<Self> {
        Ok(Self::new(V4l2Loopback::open(device_path)?))
    }
}

impl<O: FrameOutput> LoopbackSink<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            format: None,
        }
    }
}

impl<O: FrameOutput> PreviewSink for LoopbackSink<O> {
    fn show_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let (width, height) = frame.dimensions();
        if self.format != Some((width, height)) {
            self.output.set_frame_size(width, height)?;
            self.format = Some((width, height));
        }

        self.output.write_frame(&rgb_to_yuyv(frame))
    }

    fn clear(&mut self) -> Result<()> {
        if let Some((width, height)) = self.format {
            self.show_frame(&RgbImage::new(width, height))?;
        }
        Ok(())
    }
}

/// Pack an RGB frame as YUV 4:2:2 (YUYV), sharing chroma between pixel pairs
fn rgb_to_yuyv(frame: &RgbImage) -> Vec<u8> {
    let (width, height) = frame.dimensions();
    let mut yuyv = Vec::with_capacity((width.div_ceil(2) * 4 * height) as usize);

    for row in frame.rows() {
        let pixels: Vec<_> = row.collect();
        for pair in pixels.chunks(2) {
            let first = pair[0];
            let second = pair.get(1).copied().unwrap_or(first);

            let (y1, u1, v1) = rgb_to_yuv(first[0], first[1], first[2]);
            let (y2, u2, v2) = rgb_to_yuv(second[0], second[1], second[2]);

            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }

    yuyv
}

fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}
