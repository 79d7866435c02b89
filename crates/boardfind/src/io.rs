//! JSON configuration, scan loading and report helpers.

use boardfind_board::{
    BoardCorners, BoardFinderParams, CameraModel, PartitionParams, PointScan, SquareRegion,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration of a board-finding run.
///
/// `partition.rectified_size` is the side of the rectified canvas, both for
/// the written image and for the `rect_bounds` of the square report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardFindConfig {
    #[serde(default)]
    pub finder: BoardFinderParams,
    #[serde(default)]
    pub partition: PartitionParams,
    #[serde(default)]
    pub camera: Option<CameraModel>,
}

impl Default for BoardFindConfig {
    fn default() -> Self {
        Self {
            finder: BoardFinderParams::default(),
            partition: PartitionParams::default(),
            camera: None,
        }
    }
}

impl BoardFindConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_json(self, path)
    }
}

/// Per-square classification report.
#[derive(Debug, Clone, Serialize)]
pub struct SquaresReport {
    pub corners: BoardCorners,
    pub squares: Vec<SquareRegion>,
}

impl SquaresReport {
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_json(self, path)
    }
}

/// Load a point scan (`{"points": [{"position": [x, y, z], "color": [r, g, b]}, …]}`).
pub fn load_point_scan(path: impl AsRef<Path>) -> Result<PointScan, ConfigError> {
    read_json(path)
}

/// Load a camera model (`{"intrinsics": {…}, "scan_to_camera": {…}}`).
pub fn load_camera(path: impl AsRef<Path>) -> Result<CameraModel, ConfigError> {
    read_json(path)
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardfind_board::PinholeIntrinsics;

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        let mut cfg = BoardFindConfig::default();
        cfg.partition.rectified_size = 512;
        cfg.finder.hough.min_votes = 80;
        cfg.camera = Some(CameraModel::new(PinholeIntrinsics {
            width: 1280,
            height: 720,
            fx: 900.0,
            fy: 900.0,
            ppx: 640.0,
            ppy: 360.0,
        }));
        cfg.write_json(&path).expect("write");

        let back = BoardFindConfig::load_json(&path).expect("read");
        assert_eq!(back, cfg);
    }

    #[test]
    fn empty_object_is_the_default_config() {
        let cfg: BoardFindConfig = serde_json::from_str("{}").expect("json");
        assert_eq!(cfg, BoardFindConfig::default());
    }

    #[test]
    fn rectified_size_lives_under_partition() {
        let cfg: BoardFindConfig =
            serde_json::from_str(r#"{"partition": {"rectified_size": 40}}"#).expect("json");
        assert_eq!(cfg.partition.rectified_size, 40);
        assert_eq!(cfg.partition.margin, PartitionParams::default().margin);

        let json = serde_json::to_value(&cfg).expect("serialize");
        assert!(json.get("rectified_size").is_none());
        assert_eq!(json["partition"]["rectified_size"], 40);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_point_scan("/definitely/not/here.json").expect_err("missing");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
