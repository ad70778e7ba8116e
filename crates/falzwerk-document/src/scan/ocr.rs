// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition with `ocrs` (feature `ocr`).
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them into the
// default cache directory, `$XDG_CACHE_HOME/ocrs` (usually `~/.cache/ocrs`).
// Build with `--release`: rten inference in debug builds is very slow.

use std::path::{Path, PathBuf};

use falzwerk_core::error::{FalzwerkError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::capability::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expect both models, under their usual names, in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(FalzwerkError::CapabilityUnavailable(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download the models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// [`TextRecognizer`] backed by the ocrs neural engine. Models are loaded once
/// and shared by every request.
pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            FalzwerkError::CapabilityUnavailable(format!("cannot initialise OCR engine: {err}"))
        })?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        FalzwerkError::CapabilityUnavailable(format!(
            "cannot load OCR model {}: {err}",
            path.display()
        ))
    })
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            FalzwerkError::ImageError(format!("unusable page image ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| FalzwerkError::ImageError(format!("OCR preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| FalzwerkError::ImageError(format!("text recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), chars = text.len(), "Page recognised");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir_uses_standard_names() {
        let config = OcrConfig::from_dir("/tmp/models");
        assert_eq!(config.detection_model_path, PathBuf::from("/tmp/models/text-detection.rten"));
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/tmp/models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_are_capability_errors() {
        let err = OcrConfig::from_dir("/nonexistent/ocr-models").validate().unwrap_err();
        assert_eq!(err.kind(), falzwerk_core::ErrorKind::CapabilityUnavailable);
    }
}
