use crate::capture::{CameraAccess, StreamConstraints};
use crate::grab::{CapturedImage, FrameGrabber};
use crate::preview::PreviewSink;
use crate::session::{MediaSession, MediaSessionManager};
use std::fmt;

/// Controller state. The camera session and the captured still live inside
/// the variant that owns them, so neither can outlive its state.
#[derive(Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Previewing {
        session: MediaSession,
    },
    Captured {
        image: CapturedImage,
    },
}

impl CaptureState {
    pub fn phase(&self) -> CapturePhase {
        match self {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Previewing { .. } => CapturePhase::Previewing,
            CaptureState::Captured { .. } => CapturePhase::Captured,
        }
    }
}

/// Name of a [`CaptureState`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Previewing,
    Captured,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePhase::Idle => write!(f, "idle"),
            CapturePhase::Previewing => write!(f, "previewing"),
            CapturePhase::Captured => write!(f, "captured"),
        }
    }
}

pub struct CaptureController<A> {
    sessions: MediaSessionManager<A>,
    constraints: StreamConstraints,
    grabber: FrameGrabber,
    display: Box<dyn PreviewSink>,
    state: CaptureState,
}

impl<A: CameraAccess> CaptureController<A> {
    pub fn new(access: A, display: Box<dyn PreviewSink>) -> Self {
        Self {
            sessions: MediaSessionManager::new(access),
            constraints: StreamConstraints::default(),
            grabber: FrameGrabber::new(),
            display,
            state: CaptureState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn phase(&self) -> CapturePhase {
        self.state.phase()
    }

    /// The still held while in the captured state
    pub fn captured_image(&self) -> Option<&CapturedImage> {
        match &self.state {
            CaptureState::Captured { image } => Some(image),
            _ => None,
        }
    }

    /// Idle -> Previewing. Failures are logged and leave the controller idle.
    ///
    /// Returns whether the transition happened.
    pub fn open_camera(&mut self) -> bool {
        if !matches!(self.state, CaptureState::Idle) {
            tracing::debug!("Ignoring open camera while {}", self.phase());
            return false;
        }

        match self.sessions.acquire(&self.constraints) {
            Ok(session) => {
                self.state = CaptureState::Previewing { session };
                tracing::info!("Camera opened, previewing");
                true
            }
            Err(e) => {
                tracing::error!("Camera access failed: {}", e);
                false
            }
        }
    }

    /// Previewing -> Captured: grab the visible frame, then release the camera.
    ///
    /// If the preview is not ready yet the controller keeps previewing.
    pub fn take_photo(&mut self) -> bool {
        let mut session = match std::mem::take(&mut self.state) {
            CaptureState::Previewing { session } => session,
            other => {
                tracing::debug!("Ignoring take photo while {}", other.phase());
                self.state = other;
                return false;
            }
        };

        let image = match self.grabber.grab(session.surface()) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Capture skipped: {}", e);
                self.state = CaptureState::Previewing { session };
                return false;
            }
        };

        self.sessions.release(&mut session);
        drop(session);

        let (width, height) = image.dimensions();
        tracing::info!(
            "Captured {}x{} {:?} still ({} bytes)",
            width,
            height,
            image.format(),
            image.data().len()
        );
        self.show_still(&image);
        self.state = CaptureState::Captured { image };
        true
    }

    /// Captured -> Idle, discarding the still
    pub fn retake(&mut self) -> bool {
        if !matches!(self.state, CaptureState::Captured { .. }) {
            tracing::debug!("Ignoring retake while {}", self.phase());
            return false;
        }

        self.state = CaptureState::Idle;
        if let Err(e) = self.display.clear() {
            tracing::warn!("Failed to clear display: {:#}", e);
        }
        tracing::info!("Still discarded, back to idle");
        true
    }

    /// Advance the live preview by one frame. Does nothing outside previewing.
    pub fn tick(&mut self) {
        if let CaptureState::Previewing { session } = &mut self.state {
            if let Err(e) = session.surface_mut().refresh(self.display.as_mut()) {
                tracing::warn!("Preview refresh failed: {:#}", e);
            }
        }
    }

    fn show_still(&mut self, image: &CapturedImage) {
        let shown = image
            .decode()
            .map_err(anyhow::Error::from)
            .and_then(|still| self.display.show_frame(&still));
        if let Err(e) = shown {
            tracing::warn!("Failed to display still: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{Answer, StreamProbe, SyntheticAccess};
    use crate::preview::testing::RecordingSink;

    fn controller(
        access: SyntheticAccess,
    ) -> (CaptureController<SyntheticAccess>, StreamProbe, RecordingSink) {
        let probe = access.probe();
        let sink = RecordingSink::default();
        let controller = CaptureController::new(access, Box::new(sink.clone()));
        (controller, probe, sink)
    }

    /// Session and still are live exactly when the state says so
    fn assert_consistent(controller: &CaptureController<SyntheticAccess>, probe: &StreamProbe) {
        match controller.state() {
            CaptureState::Idle => {
                assert_eq!(probe.live(), 0);
                assert!(controller.captured_image().is_none());
            }
            CaptureState::Previewing { session } => {
                assert_eq!(probe.live(), 1);
                assert!(!session.is_released());
                assert!(controller.captured_image().is_none());
            }
            CaptureState::Captured { .. } => {
                assert_eq!(probe.live(), 0);
                assert!(controller.captured_image().is_some());
            }
        }
    }

    #[test]
    fn full_capture_cycle() {
        let (mut controller, probe, sink) = controller(SyntheticAccess::new(1280, 720));
        assert_eq!(controller.phase(), CapturePhase::Idle);

        assert!(controller.open_camera());
        assert_eq!(controller.phase(), CapturePhase::Previewing);
        controller.tick();
        assert_eq!(sink.log.borrow().shown, vec![(1280, 720)]);

        assert!(controller.take_photo());
        assert_eq!(controller.phase(), CapturePhase::Captured);
        assert_eq!(probe.stops(), 1);
        assert_eq!(probe.live(), 0);
        let image = controller.captured_image().unwrap();
        assert_eq!(image.decode().unwrap().dimensions(), (1280, 720));
        assert_eq!(sink.log.borrow().shown.last(), Some(&(1280, 720)));

        assert!(controller.retake());
        assert_eq!(controller.phase(), CapturePhase::Idle);
        assert!(controller.captured_image().is_none());
        assert_eq!(sink.log.borrow().cleared, 1);
        assert_consistent(&controller, &probe);
    }

    #[test]
    fn denied_permission_stays_idle() {
        let (mut controller, probe, sink) =
            controller(SyntheticAccess::new(640, 480).answering(Answer::DenyPermission));

        assert!(!controller.open_camera());
        controller.tick();

        assert_eq!(controller.phase(), CapturePhase::Idle);
        assert_eq!(probe.opened(), 0);
        assert!(sink.log.borrow().shown.is_empty());
    }

    #[test]
    fn missing_device_stays_idle() {
        let (mut controller, _, _) =
            controller(SyntheticAccess::new(640, 480).answering(Answer::NoDevice));

        assert!(!controller.open_camera());
        assert_eq!(controller.phase(), CapturePhase::Idle);
    }

    #[test]
    fn invalid_requests_are_no_ops() {
        let (mut controller, probe, _) = controller(SyntheticAccess::new(320, 240));

        assert!(!controller.take_photo());
        assert!(!controller.retake());
        assert_eq!(controller.phase(), CapturePhase::Idle);

        assert!(controller.open_camera());
        assert!(!controller.open_camera());
        assert!(!controller.retake());
        assert_eq!(probe.opened(), 1);
        assert_eq!(controller.phase(), CapturePhase::Previewing);

        controller.tick();
        assert!(controller.take_photo());
        assert!(!controller.take_photo());
        assert!(!controller.open_camera());
        assert_eq!(controller.phase(), CapturePhase::Captured);
        assert_eq!(probe.opened(), 1);
    }

    #[test]
    fn photo_before_first_frame_keeps_previewing() {
        let (mut controller, probe, _) = controller(SyntheticAccess::new(320, 240));
        controller.open_camera();

        assert!(!controller.take_photo());

        assert_eq!(controller.phase(), CapturePhase::Previewing);
        assert_eq!(probe.live(), 1);
        controller.tick();
        assert!(controller.take_photo());
    }

    #[test]
    fn invariant_holds_across_repeated_cycles() {
        let (mut controller, probe, _) = controller(SyntheticAccess::new(96, 64));
        let steps: [fn(&mut CaptureController<SyntheticAccess>) -> bool; 5] = [
            |c| c.open_camera(),
            |c| {
                c.tick();
                true
            },
            |c| c.take_photo(),
            |c| c.retake(),
            |c| c.take_photo(),
        ];

        for round in 0..3 {
            for step in steps {
                step(&mut controller);
                assert_consistent(&controller, &probe);
            }
            assert_eq!(probe.opened(), round + 1);
        }
    }

    #[test]
    fn teardown_while_previewing_releases_camera() {
        let (mut controller, probe, _) = controller(SyntheticAccess::new(320, 240));
        controller.open_camera();
        controller.tick();
        assert_eq!(probe.live(), 1);

        drop(controller);

        assert_eq!(probe.stops(), 1);
        assert_eq!(probe.live(), 0);
    }
}
