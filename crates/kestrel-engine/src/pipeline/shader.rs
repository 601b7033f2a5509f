use std::fs::File;
use std::path::Path;

use ash::vk;

use crate::error::{EngineError, Result};

/// Reads a SPIR-V binary and wraps it in a shader module.
pub fn load_shader_module(device: &ash::Device, path: &Path) -> Result<vk::ShaderModule> {
    let code = read_spirv(path)?;
    let info = vk::ShaderModuleCreateInfo::default().code(&code);
    Ok(unsafe { device.create_shader_module(&info, None)? })
}

pub(crate) fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let shader_err = |source| EngineError::Shader {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(shader_err)?;
    ash::util::read_spv(&mut file).map_err(shader_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_names_the_path() {
        let err = read_spirv(Path::new("does/not/exist.spv")).unwrap_err();
        assert!(matches!(err, EngineError::Shader { .. }));
        assert!(err.to_string().contains("does/not/exist.spv"));
    }

    #[test]
    fn reads_word_aligned_binary() {
        let path = std::env::temp_dir().join(format!("kestrel-shader-{}.spv", std::process::id()));
        let words: [u32; 2] = [0x0723_0203, 0x0001_0000];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&path, bytes).unwrap();

        let code = read_spirv(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(code, words);
    }
}
