use crate::error::Result;
use crate::mesh::DrawItem;

/// Result of asking the swapchain for the next image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AcquireOutcome {
    Ready { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; nothing was acquired.
    OutOfDate,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// GPU-facing half of the frame protocol.
///
/// [`FrameExecutor`](super::FrameExecutor) owns the ordering; implementors
/// only perform each step. `slot` is a frame-in-flight index and
/// `image_index` a swapchain image index.
pub trait FrameBackend {
    /// Number of images in the current swapchain.
    fn image_count(&self) -> usize;

    /// Blocks until the slot's last submission has completed.
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    /// Requests the next image, signalling the slot's image-available semaphore.
    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome>;

    /// Copies the camera and the draw list's transforms into the buffers of
    /// `image_index`.
    fn write_uniforms(&mut self, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()>;

    /// Resets and records the slot's command buffer for `image_index`.
    fn record(&mut self, slot: usize, image_index: u32, draws: &[DrawItem<'_>]) -> Result<()>;

    /// Returns the slot's fence to the unsignalled state.
    fn reset_slot(&mut self, slot: usize) -> Result<()>;

    /// Submits the slot's command buffer, signalling render-finished and the fence.
    fn submit(&mut self, slot: usize) -> Result<()>;

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    /// Rebuilds the swapchain and everything sized by it.
    fn recreate_swapchain(&mut self) -> Result<()>;
}
