use serde::{Deserialize, Serialize};

/// Window creation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowOptions {
    /// Initial inner width in physical pixels.
    pub width: u32,
    /// Initial inner height in physical pixels.
    pub height: u32,
    /// Window title. Tutorials replace the default with their own name.
    pub title: String,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// Allow the user to resize the window.
    pub resizable: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "gpu-primer".to_owned(),
            vsync: true,
            resizable: true,
        }
    }
}
