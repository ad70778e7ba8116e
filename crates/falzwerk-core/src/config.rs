// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FalzwerkError, Result};

/// Settings resolved once at startup and shared by every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceilings that keep a hostile or huge input from pinning a worker.
    pub limits: Limits,
    /// Raster and re-encoding defaults.
    pub render: RenderSettings,
    /// Where optional capabilities find their resources.
    pub capabilities: CapabilitySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest accepted single input, in bytes.
    pub max_input_bytes: usize,
    /// Largest accepted page count for any one document.
    pub max_pages: usize,
    /// Most input files in one request (merge, images-to-pdf).
    pub max_inputs: usize,
    /// Wall-clock budget per request, in seconds.
    pub time_budget_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_bytes: 100 * 1024 * 1024,
            max_pages: 2000,
            max_inputs: 50,
            time_budget_secs: 120,
        }
    }
}

impl Limits {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Resolution for page images when the caller does not choose one.
    pub default_dpi: u32,
    /// Resolution used for text recognition (higher for accuracy).
    pub ocr_dpi: u32,
    /// Upper bound on any requested resolution.
    pub max_dpi: u32,
    /// JPEG quality (1-100) for page images.
    pub jpeg_quality: u8,
    /// Default JPEG quality (1-100) for re-encoded images when compressing.
    pub compress_quality: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            default_dpi: 150,
            ocr_dpi: 200,
            max_dpi: 600,
            jpeg_quality: 85,
            compress_quality: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySettings {
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` uses the OCR engine's default cache directory.
    pub ocr_model_dir: Option<PathBuf>,
    /// Binarise page images before recognition.
    pub ocr_binarize: bool,
    /// Register the built-in table detector.
    pub enable_tables: bool,
    /// Directory containing the PDFium shared library. `None` searches the
    /// executable directory, then the system library path.
    pub pdfium_library_dir: Option<PathBuf>,
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        Self {
            ocr_model_dir: None,
            ocr_binarize: true,
            enable_tables: true,
            pdfium_library_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.max_input_bytes == 0 || limits.max_pages == 0 || limits.max_inputs == 0 {
            return Err(FalzwerkError::InvalidParameter(
                "limits must be greater than zero".into(),
            ));
        }
        if limits.time_budget_secs == 0 {
            return Err(FalzwerkError::InvalidParameter(
                "time budget must be at least one second".into(),
            ));
        }

        let render = &self.render;
        if render.default_dpi == 0 || render.ocr_dpi == 0 {
            return Err(FalzwerkError::InvalidParameter(
                "dpi settings must be greater than zero".into(),
            ));
        }
        if render.default_dpi > render.max_dpi || render.ocr_dpi > render.max_dpi {
            return Err(FalzwerkError::InvalidParameter(format!(
                "default dpi ({}) and OCR dpi ({}) must not exceed max dpi ({})",
                render.default_dpi, render.ocr_dpi, render.max_dpi
            )));
        }
        for (name, quality) in [
            ("jpeg_quality", render.jpeg_quality),
            ("compress_quality", render.compress_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(FalzwerkError::InvalidParameter(format!(
                    "{name} must be between 1 and 100, got {quality}"
                )));
            }
        }
        Ok(())
    }
}
