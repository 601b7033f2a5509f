use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

/// Engine-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Coarse classification of an [`EngineError`].
///
/// Callers use this to decide between aborting startup, treating the error as a
/// configuration bug, or rebuilding the swapchain and continuing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Startup could not complete; the renderer is unusable.
    Initialization,
    /// A fixed capacity or a memory heap ran out. Not retried.
    ResourceExhaustion,
    /// The surface changed under the swapchain; recreate and continue.
    TransientPresentation,
    /// Any other device failure after startup. Terminates the render loop.
    Device,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load the Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    #[error("required {kind} extension `{name}` is not available")]
    MissingExtension { kind: &'static str, name: String },

    #[error("validation layers requested but `VK_LAYER_KHRONOS_validation` is not installed")]
    ValidationUnavailable,

    #[error("no suitable physical device: {0}")]
    NoSuitableDevice(String),

    #[error("surface reports no formats or no present modes")]
    UnsupportedSurface,

    #[error("failed to load shader `{path}`: {source}")]
    Shader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frames in flight ({frames}) exceeds swapchain image count ({images})")]
    TooManyFramesInFlight { frames: usize, images: usize },

    #[error("no memory type matches bits {type_bits:#b} with {flags:?}")]
    NoCompatibleMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },

    #[error("none of {candidates:?} supports {features:?} with {tiling:?} tiling")]
    UnsupportedFormat {
        candidates: Vec<vk::Format>,
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    },

    #[error("format {0:?} does not support linear blitting for mip generation")]
    BlitUnsupported(vk::Format),

    #[error("object capacity of {capacity} reached")]
    ObjectCapacityExceeded { capacity: usize },

    #[error("descriptor pool exhausted")]
    DescriptorPoolExhausted,

    #[error("failed to import `{path}`: {reason}")]
    Import { path: PathBuf, reason: String },

    #[error("surface is out of date")]
    SurfaceOutOfDate,

    #[error("renderer has already been cleaned up")]
    Destroyed,

    #[error("vulkan call failed: {0}")]
    Vulkan(vk::Result),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Loading(_)
            | EngineError::WindowHandle(_)
            | EngineError::MissingExtension { .. }
            | EngineError::ValidationUnavailable
            | EngineError::NoSuitableDevice(_)
            | EngineError::UnsupportedSurface
            | EngineError::Shader { .. }
            | EngineError::TooManyFramesInFlight { .. }
            | EngineError::UnsupportedFormat { .. }
            | EngineError::BlitUnsupported(_)
            | EngineError::Import { .. } => ErrorKind::Initialization,

            EngineError::NoCompatibleMemoryType { .. }
            | EngineError::ObjectCapacityExceeded { .. }
            | EngineError::DescriptorPoolExhausted => ErrorKind::ResourceExhaustion,

            EngineError::SurfaceOutOfDate => ErrorKind::TransientPresentation,

            EngineError::Destroyed => ErrorKind::Device,
            EngineError::Vulkan(r) => match *r {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                    ErrorKind::ResourceExhaustion
                }
                _ => ErrorKind::Device,
            },
        }
    }

    /// True when rebuilding the swapchain is the expected recovery.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::TransientPresentation
    }
}

impl From<vk::Result> for EngineError {
    fn from(r: vk::Result) -> Self {
        match r {
            vk::Result::ERROR_OUT_OF_DATE_KHR => EngineError::SurfaceOutOfDate,
            vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                EngineError::DescriptorPoolExhausted
            }
            other => EngineError::Vulkan(other),
        }
    }
}
