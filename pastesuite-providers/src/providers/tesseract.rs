//! Tesseract OCR
//!
//! Encodes the clipboard image as PNG and pipes it through the `tesseract`
//! command-line tool.

use pastesuite_core::domain::input::ClipboardImage;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capability::OcrEngine;

const DEFAULT_BINARY: &str = "tesseract";
const DEFAULT_LANGUAGE: &str = "eng";

#[derive(Debug, Error)]
enum OcrError {
    #[error("clipboard image is empty")]
    EmptyImage,

    #[error("image buffer holds {actual} bytes, expected {expected}")]
    BadBuffer { expected: usize, actual: usize },

    #[error("failed to encode image: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("failed to run tesseract: {0}")]
    Io(#[from] std::io::Error),

    #[error("tesseract exited with {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn run(&self, image: &ClipboardImage) -> Result<String, OcrError> {
        let png = encode_png(image)?;
        debug!(
            "Running {} over {}x{} image ({} bytes)",
            self.binary,
            image.width,
            image.height,
            png.len()
        );

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // tesseract reads the whole image before writing any output
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn extract_text(&self, image: &ClipboardImage) -> String {
        match self.run(image) {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

/// Encodes tightly packed RGBA8 pixels as a PNG
fn encode_png(image: &ClipboardImage) -> Result<Vec<u8>, OcrError> {
    if image.is_empty() {
        return Err(OcrError::EmptyImage);
    }
    let expected = image.width * image.height * 4;
    if image.rgba.len() != expected {
        return Err(OcrError::BadBuffer {
            expected,
            actual: image.rgba.len(),
        });
    }

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, image.width as u32, image.height as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.rgba)?;
    }
    Ok(buf)
}
