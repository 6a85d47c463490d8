use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory the audio files are written to, created if missing.
    pub output: PathBuf,
    /// Number of entries converted concurrently.
    pub jobs: usize,
    pub existing: Existing,
    pub naming: NamingConfig,
    pub patch: PatchConfig,
    pub transcoder: TranscoderConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output_mp3"),
            jobs: 1,
            existing: Existing::default(),
            naming: NamingConfig::default(),
            patch: PatchConfig::default(),
            transcoder: TranscoderConfig::default(),
        }
    }
}

/// What to do when an entry's output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Existing {
    #[default]
    Overwrite,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// `upon` template rendering the output file stem.
    pub template: String,
    /// Longest allowed stem, in bytes.
    pub max_length: usize,
}
impl Default for NamingConfig {
    fn default() -> Self {
        Self { template: "{{ name }}".to_string(), max_length: 180 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
    /// Vendor prefix expected at the start of every `.m4s` fragment.
    pub magic: String,
    pub require_prefix: bool,
}
impl Default for PatchConfig {
    fn default() -> Self {
        Self { magic: "000000000".to_string(), require_prefix: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Pipe,
    #[serde(alias = "temp-file", alias = "temp")]
    Tempfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscoderConfig {
    /// Transcoder executable; `ffmpeg` is looked up on the `PATH` when unset.
    pub program: Option<PathBuf>,
    pub codec: String,
    pub quality: u8,
    pub extension: String,
    /// Seconds.
    pub timeout: u64,
    pub input: InputMode,
    pub extra_args: Vec<String>,
}
impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: None,
            codec: "libmp3lame".to_string(),
            quality: 2,
            extension: "mp3".to_string(),
            timeout: 600,
            input: InputMode::Pipe,
            extra_args: Vec::new(),
        }
    }
}

/// Command-line values; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Existing>,
    pub naming: NamingOverrides,
    pub transcoder: TranscoderOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscoderOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputMode>,
}
