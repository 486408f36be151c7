//! Tutorial options with TOML support.
//!
//! Window size, clear color and asset locations are consolidated here.
//! A `primer.toml` in the working directory overrides any of them.

mod assets;
mod render;
mod window;

use std::path::Path;

pub use assets::AssetOptions;
pub use render::RenderOptions;
use serde::{Deserialize, Serialize};
pub use window::WindowOptions;

use crate::error::PrimerError;

/// File looked up by [`Options::load_or_default`] when no path is given.
pub const DEFAULT_OPTIONS_FILE: &str = "primer.toml";

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[window]`) work correctly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Options {
    /// Window size, title and presentation.
    pub window: WindowOptions,
    /// Per-frame rendering parameters.
    pub render: RenderOptions,
    /// Where shaders and textures live.
    pub assets: AssetOptions,
}

impl Options {
    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::Io`] if the file cannot be read and
    /// [`PrimerError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, PrimerError> {
        let content = std::fs::read_to_string(path).map_err(PrimerError::Io)?;
        toml::from_str(&content)
            .map_err(|e| PrimerError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`PrimerError::OptionsParse`] if serialization fails and
    /// [`PrimerError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PrimerError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PrimerError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PrimerError::Io)?;
        }
        std::fs::write(path, content).map_err(PrimerError::Io)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but cannot be parsed or
    /// read.
    pub fn load_or_default(path: &Path) -> Result<Self, PrimerError> {
        if path.exists() {
            let options = Self::load(path)?;
            log::info!("loaded options from {}", path.display());
            Ok(options)
        } else {
            log::debug!("{} not found, using default options", path.display());
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[window]
width = 1024
";
        let opts: Options = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.window.width, 1024);
        // Everything else should be default
        assert_eq!(opts.window.height, 600);
        assert_eq!(opts.render.clear_color, [0.2, 0.3, 0.3, 1.0]);
        assert_eq!(opts.assets, AssetOptions::default());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("gpu-primer-{}", std::process::id()))
            .join("primer.toml");
        let mut opts = Options::default();
        opts.window.title = "saved".to_owned();
        opts.window.vsync = false;
        opts.save(&path).unwrap();
        assert_eq!(Options::load(&path).unwrap(), opts);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let opts =
            Options::load_or_default(Path::new("no/such/primer.toml")).unwrap();
        assert_eq!(opts, Options::default());
        assert!(matches!(
            Options::load(Path::new("no/such/primer.toml")),
            Err(PrimerError::Io(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let path = std::env::temp_dir()
            .join(format!("gpu-primer-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[window\nwidth = ").unwrap();
        assert!(matches!(
            Options::load(&path),
            Err(PrimerError::OptionsParse(_))
        ));
    }

    #[test]
    fn asset_paths_resolve_against_their_dirs() {
        let assets = AssetOptions::default();
        assert_eq!(
            assets.shader("triangle.vert.wgsl"),
            Path::new("shaders").join("triangle.vert.wgsl")
        );
        assert_eq!(
            assets.texture("checker.png"),
            Path::new("assets/textures").join("checker.png")
        );
    }
}
