use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::engine::DEFAULT_INPUT_PATH;

const DEFAULT_HEAP_LIMIT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
struct IngestConfigFile {
    input_path: Option<String>,
    stub_engine: Option<StubEngineConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StubEngineConfigFile {
    heap_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Virtual filesystem path encoded images are written to.
    pub input_path: String,
    pub stub_engine: StubEngineSettings,
}

#[derive(Debug, Clone)]
pub struct StubEngineSettings {
    pub heap_limit_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_path: DEFAULT_INPUT_PATH.to_string(),
            stub_engine: StubEngineSettings {
                heap_limit_bytes: DEFAULT_HEAP_LIMIT_BYTES,
            },
        }
    }
}

impl IngestConfig {
    /// Load from the JSON file named by `OCR_INGEST_CONFIG` (if set), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OCR_INGEST_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like [`IngestConfig::load`] with an explicit config file.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: IngestConfigFile) -> Self {
        let input_path = file
            .input_path
            .unwrap_or_else(|| DEFAULT_INPUT_PATH.to_string());
        let stub_engine = StubEngineSettings {
            heap_limit_bytes: file
                .stub_engine
                .and_then(|engine| engine.heap_limit_bytes)
                .unwrap_or(DEFAULT_HEAP_LIMIT_BYTES),
        };
        Self {
            input_path,
            stub_engine,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("OCR_INGEST_INPUT_PATH") {
            if !path.trim().is_empty() {
                self.input_path = path.trim().to_string();
            }
        }
        if let Ok(limit) = std::env::var("OCR_INGEST_HEAP_LIMIT") {
            self.stub_engine.heap_limit_bytes = limit
                .trim()
                .parse()
                .map_err(|_| anyhow!("OCR_INGEST_HEAP_LIMIT must be an integer number of bytes"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.input_path.starts_with('/') {
            return Err(anyhow!(
                "input_path must be an absolute engine path, got {:?}",
                self.input_path
            ));
        }
        if self.stub_engine.heap_limit_bytes == 0 {
            return Err(anyhow!("stub_engine.heap_limit_bytes must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<IngestConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
