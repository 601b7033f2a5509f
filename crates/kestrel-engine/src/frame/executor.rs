use crate::error::{EngineError, Result};
use crate::mesh::DrawItem;

use super::backend::{AcquireOutcome, FrameBackend, PresentOutcome};
use super::state::{FrameOutcome, FrameState};

/// Drives acquire → record → submit → present across a fixed number of
/// frame-in-flight slots.
#[derive(Debug)]
pub struct FrameExecutor {
    frames_in_flight: usize,
    current_frame: usize,
    /// Slot that last submitted work for each swapchain image.
    images_in_flight: Vec<Option<usize>>,
    state: FrameState,
    frames_presented: u64,
}

impl FrameExecutor {
    /// Fails when there are more slots than swapchain images, since a slot
    /// could then be handed an image another slot is still rendering to.
    pub fn new(frames_in_flight: usize, image_count: usize) -> Result<Self> {
        check_slot_count(frames_in_flight, image_count)?;
        Ok(Self {
            frames_in_flight,
            current_frame: 0,
            images_in_flight: vec![None; image_count],
            state: FrameState::Idle,
            frames_presented: 0,
        })
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Slot that last used `image_index`, if any.
    pub fn image_owner(&self, image_index: u32) -> Option<usize> {
        self.images_in_flight.get(image_index as usize).copied().flatten()
    }

    /// Renders and presents one frame of `draws`.
    pub fn draw_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        draws: &[DrawItem<'_>],
    ) -> Result<FrameOutcome> {
        let slot = self.current_frame;

        self.state = FrameState::Acquiring;
        backend.wait_for_slot(slot)?;
        let (image_index, suboptimal) = match backend.acquire_image(slot)? {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                // The fence stays signalled, so retrying this slot won't block.
                log::debug!("swapchain out of date on acquire, skipping frame");
                self.recreate(backend)?;
                return Ok(FrameOutcome::SwapchainRecreated);
            }
        };

        let image = image_index as usize;
        if image >= self.images_in_flight.len() {
            self.images_in_flight.resize(image + 1, None);
        }
        if let Some(owner) = self.images_in_flight[image] {
            if owner != slot {
                backend.wait_for_slot(owner)?;
            }
        }
        self.images_in_flight[image] = Some(slot);

        self.state = FrameState::Recording;
        backend.write_uniforms(image_index, draws)?;
        backend.record(slot, image_index, draws)?;

        backend.reset_slot(slot)?;
        backend.submit(slot)?;
        self.state = FrameState::Submitted;

        self.state = FrameState::Presenting;
        let presented = backend.present(slot, image_index);
        self.current_frame = (slot + 1) % self.frames_in_flight;
        self.frames_presented += 1;

        let needs_recreate = match presented {
            Ok(PresentOutcome::Presented) => suboptimal,
            Ok(PresentOutcome::Suboptimal | PresentOutcome::OutOfDate)
            | Err(EngineError::SurfaceOutOfDate) => true,
            Err(e) => return Err(e),
        };
        if needs_recreate {
            log::debug!("swapchain suboptimal or out of date on present");
            self.recreate(backend)?;
            return Ok(FrameOutcome::SwapchainRecreated);
        }

        self.state = FrameState::Idle;
        Ok(FrameOutcome::Presented { slot, image_index })
    }

    /// Rebuilds the backend's swapchain and forgets image ownership.
    pub fn recreate<B: FrameBackend>(&mut self, backend: &mut B) -> Result<()> {
        backend.recreate_swapchain()?;
        let images = backend.image_count();
        check_slot_count(self.frames_in_flight, images)?;
        self.images_in_flight = vec![None; images];
        self.state = FrameState::Idle;
        Ok(())
    }
}

fn check_slot_count(frames: usize, images: usize) -> Result<()> {
    if frames == 0 || frames > images {
        return Err(EngineError::TooManyFramesInFlight { frames, images });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Uniforms(u32),
        Record(usize, u32),
        Reset(usize),
        Submit(usize),
        Present(usize, u32),
        Recreate,
    }

    /// Hands out images round-robin and records every call.
    struct Recorder {
        images: usize,
        next_image: u32,
        acquire: Vec<AcquireOutcome>,
        present: Vec<PresentOutcome>,
        calls: Vec<Call>,
    }

    impl Recorder {
        fn new(images: usize) -> Self {
            Self {
                images,
                next_image: 0,
                acquire: Vec::new(),
                present: Vec::new(),
                calls: Vec::new(),
            }
        }
    }

    impl FrameBackend for Recorder {
        fn image_count(&self) -> usize {
            self.images
        }
        fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }
        fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            if !self.acquire.is_empty() {
                return Ok(self.acquire.remove(0));
            }
            let image_index = self.next_image;
            self.next_image = (self.next_image + 1) % self.images as u32;
            Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal: false,
            })
        }
        fn write_uniforms(&mut self, image_index: u32, _: &[DrawItem<'_>]) -> Result<()> {
            self.calls.push(Call::Uniforms(image_index));
            Ok(())
        }
        fn record(&mut self, slot: usize, image_index: u32, _: &[DrawItem<'_>]) -> Result<()> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }
        fn reset_slot(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Reset(slot));
            Ok(())
        }
        fn submit(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Submit(slot));
            Ok(())
        }
        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
            self.calls.push(Call::Present(slot, image_index));
            if !self.present.is_empty() {
                return Ok(self.present.remove(0));
            }
            Ok(PresentOutcome::Presented)
        }
        fn recreate_swapchain(&mut self) -> Result<()> {
            self.calls.push(Call::Recreate);
            Ok(())
        }
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn more_slots_than_images_is_rejected() {
        let err = FrameExecutor::new(3, 2).unwrap_err();
        assert!(matches!(err, EngineError::TooManyFramesInFlight { frames: 3, images: 2 }));
        assert!(FrameExecutor::new(0, 2).is_err());
        assert!(FrameExecutor::new(2, 2).is_ok());
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn one_frame_follows_the_protocol_order() {
        let mut exec = FrameExecutor::new(2, 3).unwrap();
        let mut gpu = Recorder::new(3);

        let outcome = exec.draw_frame(&mut gpu, &[]).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { slot: 0, image_index: 0 });
        assert_eq!(
            gpu.calls,
            [
                Call::Wait(0),
                Call::Acquire(0),
                Call::Uniforms(0),
                Call::Record(0, 0),
                Call::Reset(0),
                Call::Submit(0),
                Call::Present(0, 0),
            ]
        );
        assert_eq!(exec.current_frame(), 1);
        assert_eq!(exec.state(), FrameState::Idle);
    }

    #[test]
    fn slots_cycle() {
        let mut exec = FrameExecutor::new(2, 3).unwrap();
        let mut gpu = Recorder::new(3);
        let slots: Vec<usize> = (0..5)
            .map(|_| match exec.draw_frame(&mut gpu, &[]).unwrap() {
                FrameOutcome::Presented { slot, .. } => slot,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(slots, [0, 1, 0, 1, 0]);
        assert_eq!(exec.frames_presented(), 5);
    }

    #[test]
    fn image_held_by_other_slot_is_waited_on() {
        let mut exec = FrameExecutor::new(2, 2).unwrap();
        let mut gpu = Recorder::new(2);
        // Slot 0 renders image 1, then slot 1 is handed image 1 as well.
        gpu.acquire = vec![
            AcquireOutcome::Ready { image_index: 1, suboptimal: false },
            AcquireOutcome::Ready { image_index: 1, suboptimal: false },
        ];
        exec.draw_frame(&mut gpu, &[]).unwrap();
        gpu.calls.clear();

        exec.draw_frame(&mut gpu, &[]).unwrap();
        assert_eq!(&gpu.calls[..3], &[Call::Wait(1), Call::Acquire(1), Call::Wait(0)]);
        assert_eq!(exec.image_owner(1), Some(1));
    }

    // ── recreation ────────────────────────────────────────────────────────

    #[test]
    fn out_of_date_acquire_skips_without_resetting() {
        let mut exec = FrameExecutor::new(2, 2).unwrap();
        let mut gpu = Recorder::new(2);
        gpu.acquire = vec![AcquireOutcome::OutOfDate];

        let outcome = exec.draw_frame(&mut gpu, &[]).unwrap();
        assert_eq!(outcome, FrameOutcome::SwapchainRecreated);
        assert_eq!(gpu.calls, [Call::Wait(0), Call::Acquire(0), Call::Recreate]);
        assert_eq!(exec.current_frame(), 0);
        assert_eq!(exec.frames_presented(), 0);
    }

    #[test]
    fn suboptimal_present_still_presents_then_recreates() {
        let mut exec = FrameExecutor::new(2, 2).unwrap();
        let mut gpu = Recorder::new(2);
        gpu.present = vec![PresentOutcome::Suboptimal];

        let outcome = exec.draw_frame(&mut gpu, &[]).unwrap();
        assert_eq!(outcome, FrameOutcome::SwapchainRecreated);
        assert_eq!(gpu.calls.last(), Some(&Call::Recreate));
        assert!(gpu.calls.contains(&Call::Present(0, 0)));
        assert_eq!(exec.current_frame(), 1);
        assert_eq!(exec.image_owner(0), None);
    }

    #[test]
    fn recreation_rechecks_image_count() {
        let mut exec = FrameExecutor::new(2, 3).unwrap();
        let mut gpu = Recorder::new(1);
        let err = exec.recreate(&mut gpu).unwrap_err();
        assert!(matches!(err, EngineError::TooManyFramesInFlight { frames: 2, images: 1 }));
    }
}
