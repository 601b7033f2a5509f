/// Where the executor is within the current frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// What `draw_frame` did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented { slot: usize, image_index: u32 },
    /// The swapchain was rebuilt. If acquisition failed, no frame was drawn and
    /// the slot was not advanced.
    SwapchainRecreated,
    /// The framebuffer has zero area; nothing was drawn.
    Skipped,
}
