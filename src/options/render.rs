use serde::{Deserialize, Serialize};

/// Per-frame rendering parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderOptions {
    /// Linear RGBA the frame is cleared to.
    pub clear_color: [f64; 4],
    /// Log the smoothed frame rate every this many seconds (0 = never).
    pub fps_log_interval: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.2, 0.3, 0.3, 1.0],
            fps_log_interval: 0.0,
        }
    }
}

impl RenderOptions {
    /// [`clear_color`](Self::clear_color) as a wgpu color.
    #[must_use]
    pub const fn clear(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}
