use std::fs;
use std::path::Path;

use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result as DataResult};

/// Element precision of the batches handed to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputDataType {
    Float32,
    Float64,
}

impl InputDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputDataType::Float32 => "float32",
            InputDataType::Float64 => "float64",
        }
    }
}

#[derive(Config, Debug)]
pub struct DataConfig {
    /// Frame directories; only the first one is read.
    pub paths: Vec<String>,
    /// Frames are resized to `image_width x image_width`.
    pub image_width: usize,
    pub seq_length: usize,
    pub minibatch_size: usize,
    /// Label used in diagnostics.
    pub name: String,

    #[config(default = "InputDataType::Float32")]
    pub input_data_type: InputDataType,

    /// File-name prefix of the held-out final frame group.
    #[config(default = "String::from(\"10_\")")]
    pub held_out_prefix: String,

    #[config(default = "vec![String::from(\"tif\"), String::from(\"tiff\")]")]
    pub extensions: Vec<String>,
}

/// On-disk layout of [`DataConfig`]; optional keys fall back to the
/// same defaults the builder uses.
#[derive(Deserialize)]
struct DataConfigFile {
    paths: Vec<String>,
    image_width: usize,
    seq_length: usize,
    minibatch_size: usize,
    name: String,
    #[serde(default = "default_input_data_type")]
    input_data_type: InputDataType,
    #[serde(default = "default_held_out_prefix")]
    held_out_prefix: String,
    #[serde(default = "default_extensions")]
    extensions: Vec<String>,
}

fn default_input_data_type() -> InputDataType {
    InputDataType::Float32
}

fn default_held_out_prefix() -> String {
    String::from("10_")
}

fn default_extensions() -> Vec<String> {
    vec![String::from("tif"), String::from("tiff")]
}

impl From<DataConfigFile> for DataConfig {
    fn from(file: DataConfigFile) -> Self {
        DataConfig::new(
            file.paths,
            file.image_width,
            file.seq_length,
            file.minibatch_size,
            file.name,
        )
        .with_input_data_type(file.input_data_type)
        .with_held_out_prefix(file.held_out_prefix)
        .with_extensions(file.extensions)
    }
}

impl DataConfig {
    /// Reads a JSON config file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|err| {
            DataError::config(format!("cannot load {}: {}", path.display(), err))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> DataResult<Self> {
        let file: DataConfigFile = serde_json::from_str(json)
            .map_err(|err| DataError::config(format!("invalid data config: {}", err)))?;
        let config = DataConfig::from(file);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DataResult<()> {
        if self.paths.is_empty() {
            return Err(DataError::config("`paths` must name at least one directory"));
        }
        for (key, value) in [
            ("image_width", self.image_width),
            ("seq_length", self.seq_length),
            ("minibatch_size", self.minibatch_size),
        ] {
            if value == 0 {
                return Err(DataError::config(format!("`{key}` must be positive")));
            }
        }
        if self.extensions.is_empty() {
            return Err(DataError::config("`extensions` must not be empty"));
        }
        Ok(())
    }

    /// The directory frames are loaded from.
    pub fn data_path(&self) -> DataResult<&Path> {
        self.paths
            .first()
            .map(Path::new)
            .ok_or_else(|| DataError::config("`paths` must name at least one directory"))
    }
}
