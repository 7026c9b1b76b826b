//! Host-facing JSON configuration, loaded with `serde_json` and converted
//! into the core's validated [`acoustic_proto::Config`].
//!
//! Field names follow the on-disk JSON schema exactly (`camelCase`,
//! including the app-only keys that mean nothing to the physical layer).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use acoustic_proto::{Config, PhysicalLayerError};
use serde::Deserialize;

/// The JSON document a user hands to the demo binary.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub amplitude: f32,
    pub threshold: f32,
    /// Busy-sensing threshold; defaults to `threshold` when omitted, which
    /// recovers single-threshold behaviour.
    #[serde(default, rename = "busyThreshold")]
    pub busy_threshold: Option<f32>,
    pub payload: u32,
    #[serde(rename = "carrierSize")]
    pub carrier_size: usize,
    #[serde(rename = "interSize")]
    pub inter_size: usize,
    #[serde(rename = "preambleFile")]
    pub preamble_file: PathBuf,

    /// Identifies this endpoint on the virtual NIC. Meaningless to the
    /// core; carried through for the application layer.
    pub name: String,
    /// Address of this endpoint's virtual NIC. Meaningless to the core.
    pub ip: String,
    /// Artificial delay applied by a mock NIC, in milliseconds.
    #[serde(default)]
    pub delay: u64,
    /// Input file a `send` role reads its payload from, instead of stdin.
    #[serde(default, rename = "inputFile")]
    pub input_file: Option<PathBuf>,
    /// Output file a `listen` role writes received payloads to, instead
    /// of stdout.
    #[serde(default, rename = "outputFile")]
    pub output_file: Option<PathBuf>,
    /// How long, in seconds, a `listen`/`ping` role runs before exiting.
    #[serde(default)]
    pub time: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, PhysicalLayerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PhysicalLayerError::InvalidPreamble(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| PhysicalLayerError::InvalidPreamble(format!("parsing {}: {e}", path.display())))
    }

    fn load_preamble(&self) -> Result<Box<[f32]>, PhysicalLayerError> {
        let text = std::fs::read_to_string(&self.preamble_file).map_err(|e| {
            PhysicalLayerError::InvalidPreamble(format!("reading {}: {e}", self.preamble_file.display()))
        })?;

        let samples: Result<Vec<f32>, _> =
            text.lines().filter(|line| !line.trim().is_empty()).map(|line| line.trim().parse::<f32>()).collect();
        let samples = samples.map_err(|e| {
            PhysicalLayerError::InvalidPreamble(format!("{}: {e}", self.preamble_file.display()))
        })?;

        if samples.is_empty() {
            return Err(PhysicalLayerError::InvalidPreamble(format!(
                "{} contains no samples",
                self.preamble_file.display()
            )));
        }

        Ok(samples.into_boxed_slice())
    }
}

impl TryFrom<&FileConfig> for Config {
    type Error = PhysicalLayerError;

    fn try_from(file: &FileConfig) -> Result<Self, Self::Error> {
        let preamble = file.load_preamble()?;
        Config::new(
            file.amplitude,
            file.threshold,
            file.busy_threshold.unwrap_or(file.threshold),
            file.payload,
            file.carrier_size,
            file.inter_size,
            preamble,
        )
    }
}

/// Builds a validated [`Config`] wrapped for cheap sharing across the two
/// executor threads.
pub fn load_config(path: &Path) -> Result<(Arc<Config>, FileConfig), PhysicalLayerError> {
    let file = FileConfig::load(path)?;
    let config = Config::try_from(&file)?;
    Ok((Arc::new(config), file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_json_schema() {
        let json = r#"{
            "amplitude": 0.8,
            "threshold": 4.0,
            "payload": 3,
            "carrierSize": 2,
            "interSize": 10,
            "preambleFile": "preamble.txt",
            "name": "host-a",
            "ip": "10.0.0.1",
            "delay": 5,
            "time": 30
        }"#;
        let file: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(file.payload, 3);
        assert_eq!(file.carrier_size, 2);
        assert_eq!(file.busy_threshold, None);
        assert_eq!(file.input_file, None);
    }
}
