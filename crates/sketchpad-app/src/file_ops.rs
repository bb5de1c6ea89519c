//! Native file operations: config loading, persistent store and PNG export.

use sketchpad_core::storage::create_default_store;
use sketchpad_core::{MemoryStore, SavedImage, SketchConfig, SnapshotStore};
use std::fs;
use std::path::{Path, PathBuf};

/// Location of the optional user config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sketchpad").join("config.json"))
}

/// Load the user config, falling back to defaults when missing or invalid.
pub fn load_config() -> SketchConfig {
    let Some(path) = config_path() else {
        return SketchConfig::default();
    };
    load_config_from(&path)
}

fn load_config_from(path: &Path) -> SketchConfig {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(_) => return SketchConfig::default(),
    };
    match SketchConfig::from_json(&json) {
        Ok(config) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Ignoring config {:?}: {}", path, e);
            SketchConfig::default()
        }
    }
}

/// Open the persistent store, or an in-memory one if it is unavailable.
pub fn open_store() -> Box<dyn SnapshotStore> {
    match create_default_store() {
        Ok(store) => {
            log::info!("Saving drawings under {:?}", store.base_path());
            Box::new(store)
        }
        Err(e) => {
            log::warn!("Persistent storage unavailable ({}), drawings will not survive restart", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// Directory that plays the role of the browser's downloads.
pub fn export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write an exported PNG into `dir`, returning its path.
pub fn export_png_to(dir: &Path, saved: &SavedImage) -> std::io::Result<PathBuf> {
    let path = dir.join(&saved.file_name);
    fs::write(&path, &saved.png)?;
    Ok(path)
}

/// Write an exported PNG into the download directory.
pub fn export_png(saved: &SavedImage) {
    match export_png_to(&export_dir(), saved) {
        Ok(path) => log::info!("Exported PNG to: {:?}", path),
        Err(e) => log::error!("Failed to write PNG: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_named_file() {
        let temp = TempDir::new().unwrap();
        let saved = SavedImage {
            file_name: "my-canvas.png".to_string(),
            png: vec![0x89, b'P', b'N', b'G'],
        };
        let path = export_png_to(temp.path(), &saved).unwrap();
        assert_eq!(path.file_name().unwrap(), "my-canvas.png");
        assert_eq!(fs::read(path).unwrap(), saved.png);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config_from(&temp.path().join("config.json"));
        assert_eq!(config, SketchConfig::default());
    }

    #[test]
    fn test_invalid_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "min_width": -5 }"#).unwrap();
        assert_eq!(load_config_from(&path), SketchConfig::default());
    }

    #[test]
    fn test_config_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "title": "Doodles", "line_width": 3 }"#).unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.title, "Doodles");
        assert!((config.line_width - 3.0).abs() < f64::EPSILON);
    }
}
