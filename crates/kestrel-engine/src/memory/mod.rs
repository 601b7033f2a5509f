//! Buffer and image allocation, plus the one-shot transfer commands used to
//! fill them.

mod allocator;
mod commands;

pub use allocator::{
    Buffer, Image, ImageDesc, choose_supported_format, create_device_local_buffer, create_image,
    create_image_view, depth_format, find_memory_type, first_supported_format,
};
pub use commands::{
    TransitionMasks, copy_buffer, copy_buffer_to_image, submit_once, transition_image_layout,
    transition_masks,
};
