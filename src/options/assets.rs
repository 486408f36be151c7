use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Asset directories, relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetOptions {
    /// WGSL stage sources.
    pub shader_dir: PathBuf,
    /// Shared `#import` modules, registered before any stage compiles.
    pub shader_module_dir: PathBuf,
    /// Image files.
    pub texture_dir: PathBuf,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shaders"),
            shader_module_dir: PathBuf::from("shaders/common"),
            texture_dir: PathBuf::from("assets/textures"),
        }
    }
}

impl AssetOptions {
    /// Path of a shader file.
    #[must_use]
    pub fn shader(&self, file: &str) -> PathBuf {
        self.shader_dir.join(file)
    }

    /// Path of an image file.
    #[must_use]
    pub fn texture(&self, file: &str) -> PathBuf {
        self.texture_dir.join(file)
    }
}
