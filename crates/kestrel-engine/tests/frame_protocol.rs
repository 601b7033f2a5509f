//! Drives the frame executor against a simulated GPU queue.

use std::collections::VecDeque;

use glam::{Mat4, Vec3};
use kestrel_engine::Result;
use kestrel_engine::frame::{AcquireOutcome, FrameBackend, FrameExecutor, FrameOutcome, PresentOutcome};
use kestrel_engine::mesh::{DrawItem, ModelRegistry};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Completed { slot: usize, submission: usize },
    Recorded { slot: usize, image: u32 },
    Submitted { slot: usize, submission: usize },
    Presented { slot: usize, image: u32 },
}

struct Submission {
    id: usize,
    slot: usize,
}

/// Fences plus a FIFO queue. Work only completes when someone waits on it.
struct SimulatedGpu {
    images: usize,
    next_image: u32,
    fence_signalled: Vec<bool>,
    queue: VecDeque<Submission>,
    submissions: usize,
    max_in_flight: usize,
    /// Transforms pushed by each recorded command buffer, by slot.
    recorded: Vec<Vec<(usize, Mat4)>>,
    /// Transforms written to each image's dynamic buffer.
    uniforms: Vec<Vec<(usize, Mat4)>>,
    events: Vec<Event>,
}

impl SimulatedGpu {
    fn new(slots: usize, images: usize) -> Self {
        Self {
            images,
            next_image: 0,
            fence_signalled: vec![true; slots],
            queue: VecDeque::new(),
            submissions: 0,
            max_in_flight: 0,
            recorded: vec![Vec::new(); slots],
            uniforms: vec![Vec::new(); images],
            events: Vec::new(),
        }
    }

    fn position(&self, event: &Event) -> usize {
        self.events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{event:?} never happened"))
    }
}

impl FrameBackend for SimulatedGpu {
    fn image_count(&self) -> usize {
        self.images
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        while !self.fence_signalled[slot] {
            let done = self.queue.pop_front().expect("waited on a fence with nothing queued");
            self.fence_signalled[done.slot] = true;
            self.events.push(Event::Completed {
                slot: done.slot,
                submission: done.id,
            });
        }
        Ok(())
    }

    fn acquire_image(&mut self, _slot: usize) -> Result<AcquireOutcome> {
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images as u32;
        Ok(AcquireOutcome::Ready {
            image_index,
            suboptimal: false,
        })
    }

    fn write_uniforms(&mut self, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()> {
        self.uniforms[image_index as usize] = draws.iter().map(|d| (d.object, d.transform)).collect();
        Ok(())
    }

    fn record(&mut self, slot: usize, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()> {
        assert!(
            !self.queue.iter().any(|s| s.slot == slot),
            "slot {slot} re-recorded while its previous submission is pending"
        );
        self.recorded[slot] = draws.iter().map(|d| (d.object, d.transform)).collect();
        self.events.push(Event::Recorded {
            slot,
            image: image_index,
        });
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        assert!(self.fence_signalled[slot], "reset of a fence still in use");
        self.fence_signalled[slot] = false;
        Ok(())
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        assert!(!self.fence_signalled[slot], "submitted without resetting the fence");
        let id = self.submissions;
        self.submissions += 1;
        self.queue.push_back(Submission { id, slot });
        self.max_in_flight = self.max_in_flight.max(self.queue.len());
        self.events.push(Event::Submitted {
            slot,
            submission: id,
        });
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        self.events.push(Event::Presented {
            slot,
            image: image_index,
        });
        Ok(PresentOutcome::Presented)
    }

    fn recreate_swapchain(&mut self) -> Result<()> {
        Ok(())
    }
}

fn presented_slot(outcome: FrameOutcome) -> usize {
    match outcome {
        FrameOutcome::Presented { slot, .. } => slot,
        other => panic!("expected a presented frame, got {other:?}"),
    }
}

// ── end to end ───────────────────────────────────────────────────────────

#[test]
fn two_models_three_frames() {
    let mut models = ModelRegistry::new(20);
    let a = models.insert(Vec::new()).unwrap();
    let b = models.insert(Vec::new()).unwrap();
    let shifted = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    assert!(models.update(a, Mat4::IDENTITY));
    assert!(models.update(b, shifted));

    let mut executor = FrameExecutor::new(2, 3).unwrap();
    let mut gpu = SimulatedGpu::new(2, 3);

    let slots: Vec<usize> = (0..3)
        .map(|_| presented_slot(executor.draw_frame(&mut gpu, &models.draw_list()).unwrap()))
        .collect();

    // Slots cycle, and consecutive frames never share one.
    assert_eq!(slots, [0, 1, 0]);

    // The third frame reuses slot 0 only after submission 0 has completed.
    let completed = gpu.position(&Event::Completed { slot: 0, submission: 0 });
    let submitted_first = gpu.position(&Event::Submitted { slot: 0, submission: 0 });
    let rerecorded = gpu
        .events
        .iter()
        .rposition(|e| matches!(e, Event::Recorded { slot: 0, .. }))
        .unwrap();
    assert!(submitted_first < completed);
    assert!(completed < rerecorded);

    assert!(gpu.max_in_flight <= 2);
    assert_eq!(gpu.submissions, 3);

    let expected = vec![(0, Mat4::IDENTITY), (1, shifted)];
    assert_eq!(gpu.recorded[0], expected);
    assert_eq!(gpu.uniforms[2], expected);
}

#[test]
fn pushed_transforms_follow_latest_update() {
    let mut models = ModelRegistry::new(4);
    let ids: Vec<_> = (0..3).map(|_| models.insert(Vec::new()).unwrap()).collect();

    let mut executor = FrameExecutor::new(2, 2).unwrap();
    let mut gpu = SimulatedGpu::new(2, 2);

    for frame in 0..6u32 {
        // Interleave several updates per frame across different ids.
        for (i, &id) in ids.iter().enumerate() {
            let t = Mat4::from_translation(Vec3::new(frame as f32, i as f32, 0.0));
            models.update(id, t);
            if i == 1 {
                models.update(ids[0], Mat4::from_scale(Vec3::splat(frame as f32 + 1.0)));
            }
        }

        let slot = presented_slot(executor.draw_frame(&mut gpu, &models.draw_list()).unwrap());

        let pushed = &gpu.recorded[slot];
        assert_eq!(pushed.len(), ids.len());
        for (object, transform) in pushed {
            assert_eq!(Some(*transform), models.transform(ids[*object]));
        }
        assert_eq!(pushed[0].1, Mat4::from_scale(Vec3::splat(frame as f32 + 1.0)));
    }

    assert!(gpu.max_in_flight <= 2);
}

#[test]
fn update_with_foreign_id_changes_nothing() {
    let mut models = ModelRegistry::new(2);
    let a = models.insert(Vec::new()).unwrap();

    let mut larger = ModelRegistry::new(8);
    let foreign = (0..4).map(|_| larger.insert(Vec::new()).unwrap()).last().unwrap();
    assert!(!models.update(foreign, Mat4::ZERO));

    let mut executor = FrameExecutor::new(2, 2).unwrap();
    let mut gpu = SimulatedGpu::new(2, 2);
    executor.draw_frame(&mut gpu, &models.draw_list()).unwrap();
    assert_eq!(gpu.recorded[0], vec![(a.index(), Mat4::IDENTITY)]);
}

#[test]
fn fence_wait_blocks_until_submission_completes() {
    let models = ModelRegistry::new(1);
    let mut executor = FrameExecutor::new(2, 3).unwrap();
    let mut gpu = SimulatedGpu::new(2, 3);

    for _ in 0..10 {
        executor.draw_frame(&mut gpu, &models.draw_list()).unwrap();
        assert!(gpu.queue.len() <= 2);
    }

    // Submissions complete in order and none is lost.
    let completed: Vec<usize> = gpu
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Completed { submission, .. } => Some(*submission),
            _ => None,
        })
        .collect();
    assert_eq!(completed, (0..completed.len()).collect::<Vec<_>>());
    assert_eq!(completed.len() + gpu.queue.len(), 10);
    assert!(completed.len() >= 8);
}
