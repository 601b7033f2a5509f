//! Descriptor set layouts, pools and the uniform data they expose to shaders.

mod layouts;
mod sampler_pool;
mod uniform_sets;
mod uniforms;

pub use layouts::{
    UniformSetPlan, sampler_layout_bindings, sampler_pool_sizes, uniform_layout_bindings,
    uniform_pool_sizes, uniform_set_plan,
};
pub use sampler_pool::SamplerPools;
pub use uniform_sets::UniformSets;
pub use uniforms::{ModelTransform, TransferSpace, ViewProjection, aligned_stride};
