use super::{CameraAccess, CameraError, MediaStream, StreamConstraints};
use anyhow::Result;
use image::{Rgb, RgbImage};
use std::cell::Cell;
use std::rc::Rc;

/// How the synthetic camera answers a stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Grant,
    DenyPermission,
    NoDevice,
}

/// Shared view of the streams a [`SyntheticAccess`] handed out
#[derive(Debug, Clone, Default)]
pub struct StreamProbe {
    opened: Rc<Cell<u32>>,
    stops: Rc<Cell<u32>>,
    live: Rc<Cell<u32>>,
}

impl StreamProbe {
    pub fn opened(&self) -> u32 {
        self.opened.get()
    }

    /// Number of times a live stream had its tracks stopped
    pub fn stops(&self) -> u32 {
        self.stops.get()
    }

    /// Number of streams still running
    pub fn live(&self) -> u32 {
        self.live.get()
    }
}

pub struct SyntheticAccess {
    width: u32,
    height: u32,
    /// Size of every frame after the first, when it differs
    later_size: Option<(u32, u32)>,
    answer: Answer,
    probe: StreamProbe,
}

impl SyntheticAccess {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            later_size: None,
            answer: Answer::Grant,
            probe: StreamProbe::default(),
        }
    }

    pub fn answering(mut self, answer: Answer) -> Self {
        self.answer = answer;
        self
    }

    /// Deliver the first frame at the negotiated size and the rest at `width`x`height`
    pub fn resizing_to(mut self, width: u32, height: u32) -> Self {
        self.later_size = Some((width, height));
        self
    }

    pub fn probe(&self) -> StreamProbe {
        self.probe.clone()
    }
}

impl CameraAccess for SyntheticAccess {
    fn request_stream(
        &mut self,
        _constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        match self.answer {
            Answer::DenyPermission => Err(CameraError::PermissionDenied(
                "NotAllowedError: user dismissed the prompt".into(),
            )),
            Answer::NoDevice => Err(CameraError::NotFound),
            Answer::Grant => {
                self.probe.opened.set(self.probe.opened.get() + 1);
                self.probe.live.set(self.probe.live.get() + 1);
                Ok(Box::new(SyntheticStream {
                    width: self.width,
                    height: self.height,
                    later_size: self.later_size,
                    frame_index: 0,
                    live: true,
                    probe: self.probe.clone(),
                }))
            }
        }
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    later_size: Option<(u32, u32)>,
    frame_index: u32,
    live: bool,
    probe: StreamProbe,
}

impl MediaStream for SyntheticStream {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        anyhow::ensure!(self.live, "Synthetic stream has been stopped");
        let (width, height) = match self.later_size {
            Some(size) if self.frame_index > 0 => size,
            _ => (self.width, self.height),
        };
        self.frame_index += 1;
        let shift = (self.frame_index % 256) as u8;
        Ok(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x % 256) as u8,
                (y % 256) as u8,
                shift,
            ])
        }))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn stop(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.probe.stops.set(self.probe.stops.get() + 1);
        self.probe.live.set(self.probe.live.get() - 1);
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
