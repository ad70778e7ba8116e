// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operation dispatcher — the single entry point used by the request layer.
//
// `execute` takes an operation name, the uploaded files and a string
// parameter map, and returns either a finished artifact or a structured
// error. Each request walks Received -> Validated -> Executing ->
// Completed | Failed, and nothing is returned on failure except the error.

pub mod params;

use std::collections::HashMap;
use std::str::FromStr;

use falzwerk_core::config::EngineConfig;
use falzwerk_core::error::{FalzwerkError, Result};
use falzwerk_core::integrity::content_id;
use falzwerk_core::{
    DocumentType, ImageOutputFormat, Operation, PageSelection, RequestId, RequestState, Rotation,
    Secret, StructuredError, TableFormat, WatermarkStyle,
};
use tracing::{debug, info, info_span, warn};

use crate::capability::Capabilities;
use crate::convert::{self, TextOptions};
use crate::limits::Deadline;
use crate::office::{ZipPackage, write_csv, write_xlsx};
use crate::pdf::{self, DocumentHandle, EncodeOptions};

pub use params::Params;

/// One uploaded file. `name` is only used for the sniffing fallback and is
/// never used to address anything internally.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// The finished output of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl Artifact {
    fn new(bytes: Vec<u8>, filename: impl Into<String>, kind: DocumentType) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: kind.mime_type().to_owned(),
        }
    }
}

/// An operation with its parameters parsed and range-checked.
#[derive(Debug)]
enum Plan {
    Merge { password: Option<Secret> },
    Split { password: Option<Secret> },
    Compress { password: Option<Secret>, quality: u8 },
    Rotate { password: Option<Secret>, pages: PageSelection, rotation: Rotation },
    Watermark { password: Option<Secret>, pages: PageSelection, text: String, style: WatermarkStyle },
    Encrypt { user: Secret, owner: Option<Secret> },
    Decrypt { password: Option<Secret> },
    ExtractPages { password: Option<Secret>, pages: PageSelection },
    ToImages { password: Option<Secret>, dpi: u32, format: ImageOutputFormat },
    ImagesToPdf,
    ToDocx { password: Option<Secret> },
    ToPptx { password: Option<Secret>, dpi: u32 },
    Ocr { password: Option<Secret>, dpi: u32 },
    ExtractTables { password: Option<Secret>, format: TableFormat },
}

/// Tracks the request lifecycle and logs every transition.
struct Lifecycle {
    state: RequestState,
}

impl Lifecycle {
    fn new() -> Self {
        debug!(state = ?RequestState::Received, "Request received");
        Self {
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "Request state changed");
        self.state = next;
    }
}

/// Validates requests and runs them against the configured capabilities.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: EngineConfig,
    capabilities: Capabilities,
}

impl Dispatcher {
    pub fn new(config: EngineConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run one request end to end.
    pub fn execute(
        &self,
        operation: &str,
        inputs: Vec<InputFile>,
        params: &HashMap<String, String>,
    ) -> std::result::Result<Artifact, StructuredError> {
        let request_id = RequestId::new();
        let span = info_span!("request", %request_id, operation);
        let _guard = span.enter();

        let mut lifecycle = Lifecycle::new();
        let deadline = Deadline::start(self.config.limits.time_budget());

        let outcome = self
            .validate(operation, &inputs, Params::new(params))
            .and_then(|plan| {
                lifecycle.advance(RequestState::Validated);
                lifecycle.advance(RequestState::Executing);
                self.run(plan, inputs, &deadline)
            });

        match outcome {
            Ok(artifact) => {
                lifecycle.advance(RequestState::Completed);
                info!(
                    filename = %artifact.filename,
                    bytes_len = artifact.bytes.len(),
                    elapsed_ms = deadline.elapsed().as_millis() as u64,
                    "Request completed"
                );
                Ok(artifact)
            }
            Err(err) => {
                lifecycle.advance(RequestState::Failed);
                warn!(kind = %err.kind(), error = %err, "Request failed");
                Err(err.to_structured())
            }
        }
    }

    fn validate(&self, operation: &str, inputs: &[InputFile], params: Params<'_>) -> Result<Plan> {
        let op = Operation::from_str(operation)?;
        self.check_inputs(op, inputs)?;

        let unknown = params.unknown_keys();
        if !unknown.is_empty() {
            debug!(?unknown, "Ignoring unknown parameters");
        }

        let render = &self.config.render;
        let password = params.secret("password");
        let plan = match op {
            Operation::Merge => Plan::Merge { password },
            Operation::Split => Plan::Split { password },
            Operation::Compress => Plan::Compress {
                password,
                quality: params.quality(render.compress_quality)?,
            },
            Operation::Rotate => Plan::Rotate {
                password,
                pages: params.pages()?,
                rotation: params.rotation()?,
            },
            Operation::Watermark => Plan::Watermark {
                password,
                pages: params.pages()?,
                text: params.text(),
                style: params.watermark_style()?,
            },
            Operation::Encrypt => Plan::Encrypt {
                user: params.required_secret("password")?,
                owner: params.secret("owner_password").filter(|s| !s.expose().is_empty()),
            },
            Operation::Decrypt => Plan::Decrypt { password },
            Operation::ExtractPages => Plan::ExtractPages {
                password,
                pages: params.pages()?,
            },
            Operation::ToImages => Plan::ToImages {
                password,
                dpi: convert::check_dpi(params.dpi(render.default_dpi)?, render.max_dpi)?,
                format: params.image_format()?,
            },
            Operation::ImagesToPdf => Plan::ImagesToPdf,
            Operation::ToDocx => Plan::ToDocx { password },
            Operation::ToPptx => Plan::ToPptx {
                password,
                dpi: convert::check_dpi(params.dpi(render.default_dpi)?, render.max_dpi)?,
            },
            Operation::Ocr => Plan::Ocr {
                password,
                dpi: convert::check_dpi(params.dpi(render.ocr_dpi)?, render.max_dpi)?,
            },
            Operation::ExtractTables => Plan::ExtractTables {
                password,
                format: params.table_format()?,
            },
        };
        info!(operation = op.name(), inputs = inputs.len(), "Request validated");
        Ok(plan)
    }

    fn check_inputs(&self, op: Operation, inputs: &[InputFile]) -> Result<()> {
        let limits = &self.config.limits;
        if inputs.is_empty() {
            return Err(FalzwerkError::InvalidParameter(format!(
                "{op} needs at least one input file"
            )));
        }
        if !op.accepts_multiple_inputs() && inputs.len() != 1 {
            return Err(FalzwerkError::InvalidParameter(format!(
                "{op} takes exactly one input file, got {}",
                inputs.len()
            )));
        }
        if inputs.len() > limits.max_inputs {
            return Err(FalzwerkError::ResourceExhausted(format!(
                "{} input files exceed the limit of {}",
                inputs.len(),
                limits.max_inputs
            )));
        }

        for (index, input) in inputs.iter().enumerate() {
            if input.bytes.len() > limits.max_input_bytes {
                return Err(FalzwerkError::ResourceExhausted(format!(
                    "input #{index} is {} bytes, above the limit of {}",
                    input.bytes.len(),
                    limits.max_input_bytes
                )));
            }
            let kind = detect_type(input).ok_or_else(|| {
                FalzwerkError::UnsupportedFormat(format!(
                    "input #{index} is not a PDF or a supported image"
                ))
            })?;
            if !op.accepted_inputs().contains(&kind) {
                return Err(FalzwerkError::UnsupportedFormat(format!(
                    "{op} does not accept {} input (input #{index})",
                    kind.extension()
                )));
            }
            debug!(
                input = index,
                content = %content_id(&input.bytes),
                bytes_len = input.bytes.len(),
                kind = kind.extension(),
                "Input accepted"
            );
        }
        Ok(())
    }

    fn decode(&self, input: &InputFile, password: Option<&Secret>) -> Result<DocumentHandle> {
        let handle = pdf::decode(&input.bytes, password)?;
        let max_pages = self.config.limits.max_pages;
        if handle.page_count() > max_pages {
            return Err(FalzwerkError::ResourceExhausted(format!(
                "document has {} pages, above the limit of {max_pages}",
                handle.page_count()
            )));
        }
        Ok(handle)
    }

    fn decode_single(&self, inputs: &[InputFile], password: Option<&Secret>) -> Result<DocumentHandle> {
        let input = inputs.first().ok_or_else(|| {
            FalzwerkError::InvalidParameter("no input file".into())
        })?;
        self.decode(input, password)
    }

    fn run(&self, plan: Plan, inputs: Vec<InputFile>, deadline: &Deadline) -> Result<Artifact> {
        let caps = &self.capabilities;
        let pdf_output = |handle: &DocumentHandle, name: &str, optimize: bool| -> Result<Artifact> {
            let bytes = pdf::encode(handle, EncodeOptions { optimize, linearize: false })?;
            Ok(Artifact::new(bytes, name, DocumentType::Pdf))
        };

        match plan {
            Plan::Merge { password } => {
                let mut handles = Vec::with_capacity(inputs.len());
                let mut total_pages = 0;
                for (index, input) in inputs.iter().enumerate() {
                    deadline.check(&format!("decoding input #{index}"))?;
                    let handle = self
                        .decode(input, password.as_ref())
                        .map_err(|err| match err {
                            FalzwerkError::Encrypted => FalzwerkError::EncryptedInput { index },
                            other => other,
                        })?;
                    total_pages += handle.page_count();
                    handles.push(handle);
                }
                if total_pages > self.config.limits.max_pages {
                    return Err(FalzwerkError::ResourceExhausted(format!(
                        "merged document would have {total_pages} pages, above the limit of {}",
                        self.config.limits.max_pages
                    )));
                }
                pdf_output(&pdf::merge(handles)?, "merged.pdf", false)
            }

            Plan::Split { password } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let mut archive = ZipPackage::new();
                for (index, part) in pdf::split(handle)?.iter().enumerate() {
                    deadline.check(&format!("writing part {}", index + 1))?;
                    let bytes = pdf::encode(part, EncodeOptions::default())?;
                    archive.add(&format!("page_{}.pdf", index + 1), &bytes)?;
                }
                Ok(Artifact::new(archive.finish()?, "split.zip", DocumentType::Zip))
            }

            Plan::Compress { password, quality } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                pdf_output(&pdf::compress(handle, quality)?, "compressed.pdf", true)
            }

            Plan::Rotate { password, pages, rotation } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                pdf_output(&pdf::rotate(handle, &pages, rotation)?, "rotated.pdf", false)
            }

            Plan::Watermark { password, pages, text, style } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                pdf_output(&pdf::watermark(handle, &pages, &text, &style)?, "watermarked.pdf", false)
            }

            Plan::Encrypt { user, owner } => {
                let handle = self.decode_single(&inputs, None)?;
                pdf_output(&pdf::encrypt(handle, user, owner)?, "protected.pdf", false)
            }

            Plan::Decrypt { password } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let secret = password.unwrap_or_else(|| Secret::new(""));
                pdf_output(&pdf::decrypt(handle, &secret)?, "unlocked.pdf", false)
            }

            Plan::ExtractPages { password, pages } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                pdf_output(&pdf::extract_pages(handle, &pages)?, "extracted.pdf", false)
            }

            Plan::ToImages { password, dpi, format } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let images = convert::to_images(caps, &handle, dpi, deadline)?;
                let quality = self.config.render.jpeg_quality;
                if let [single] = images.as_slice() {
                    return Ok(Artifact::new(
                        single.encode(format, quality)?,
                        single.file_name(format),
                        format.document_type(),
                    ));
                }
                let mut archive = ZipPackage::new();
                for image in &images {
                    archive.add(&image.file_name(format), &image.encode(format, quality)?)?;
                }
                Ok(Artifact::new(archive.finish()?, "pages.zip", DocumentType::Zip))
            }

            Plan::ImagesToPdf => {
                let data: Vec<&[u8]> = inputs.iter().map(|i| i.bytes.as_slice()).collect();
                let images = convert::decode_images(&data)?;
                deadline.check("building the PDF")?;
                pdf_output(&convert::images_to_document(&images)?, "converted.pdf", false)
            }

            Plan::ToDocx { password } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let encoder = caps.editable_encoder()?;
                let bytes = convert::to_editable_document(caps, &handle)?;
                let kind = encoder.content_type();
                Ok(Artifact::new(bytes, format!("converted.{}", kind.extension()), kind))
            }

            Plan::ToPptx { password, dpi } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let bytes = convert::to_slides(caps, &handle, dpi, deadline)?;
                Ok(Artifact::new(bytes, "presentation.pptx", DocumentType::Pptx))
            }

            Plan::Ocr { password, dpi } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let options = TextOptions {
                    dpi,
                    binarize: self.config.capabilities.ocr_binarize,
                };
                let extracted = convert::extract_text(caps, &handle, options, deadline)?;
                let bytes = serde_json::to_vec_pretty(&extracted)?;
                Ok(Artifact::new(bytes, "ocr.json", DocumentType::Json))
            }

            Plan::ExtractTables { password, format } => {
                let handle = self.decode_single(&inputs, password.as_ref())?;
                let pages = convert::extract_tables(caps, &handle, deadline)?;
                match format {
                    TableFormat::Xlsx => Ok(Artifact::new(write_xlsx(&pages)?, "tables.xlsx", DocumentType::Xlsx)),
                    TableFormat::Csv => Ok(Artifact::new(write_csv(&pages)?, "tables.csv", DocumentType::Csv)),
                }
            }
        }
    }
}

/// Type by signature, falling back to the file extension when the bytes are
/// not recognised.
fn detect_type(input: &InputFile) -> Option<DocumentType> {
    DocumentType::sniff(&input.bytes).or_else(|| {
        let ext = input.name.rsplit_once('.').map(|(_, ext)| ext)?;
        DocumentType::from_extension(ext).filter(DocumentType::is_raster_image)
    })
}
