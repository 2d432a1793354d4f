//! QR payload construction plus the thin encode/decode wrappers.
//!
//! The payload rules are exact: reference mode encodes a storefront details
//! link (with the optional note as a query parameter), freeform mode encodes
//! operator text (with the note as a two-line suffix).
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use image::Luma;
use qrcode::{EcLevel, QrCode};
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::Product;

/// Minimum rendered edge in pixels, sized for print.
const MIN_PIXELS: u32 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrMode {
    /// Encode a link to an existing product's details page.
    Reference,
    /// Encode arbitrary operator-supplied text.
    Freeform,
}

/// Form state feeding the payload builder.
#[derive(Debug, Clone)]
pub struct QrForm {
    pub mode: QrMode,
    /// Selected product id; meaningful in reference mode only.
    pub target_id: String,
    /// Used in freeform mode only.
    pub freeform_text: String,
    /// Optional note attached to either mode.
    pub annotation: String,
}

impl QrForm {
    pub fn reference(target_id: impl Into<String>) -> Self {
        Self {
            mode: QrMode::Reference,
            target_id: target_id.into(),
            freeform_text: String::new(),
            annotation: String::new(),
        }
    }

    pub fn freeform(text: impl Into<String>) -> Self {
        Self {
            mode: QrMode::Freeform,
            target_id: String::new(),
            freeform_text: text.into(),
            annotation: String::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    /// Nothing selected yet: fall back to the first loaded product.
    pub fn default_target(&mut self, products: &[Product]) {
        if self.target_id.is_empty() {
            if let Some(first) = products.first() {
                self.target_id = first.id.clone();
            }
        }
    }

    /// Compute the exact text to encode. Empty means generation is disabled.
    pub fn payload(&self, frontend_origin: &str, details_path: &str) -> String {
        match self.mode {
            QrMode::Reference => {
                if self.target_id.is_empty() {
                    return String::new();
                }
                let base = format!(
                    "{}/{}/{}",
                    frontend_origin.trim_end_matches('/'),
                    details_path,
                    self.target_id
                );
                let note = self.annotation.trim();
                if note.is_empty() {
                    return base;
                }
                match Url::parse(&base) {
                    Ok(mut url) => {
                        url.query_pairs_mut().append_pair("note", note);
                        url.to_string()
                    }
                    // Unparseable base: encode it unmodified rather than fail.
                    Err(_) => base,
                }
            }
            QrMode::Freeform => {
                let text = self.freeform_text.trim();
                if text.is_empty() {
                    return String::new();
                }
                let note = self.annotation.trim();
                if note.is_empty() {
                    text.to_string()
                } else {
                    format!("{text}\n\nNote: {note}")
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQr {
    pub path: PathBuf,
    pub payload: String,
}

/// Encode a payload to a print-ready PNG under `out_dir`, named by timestamp.
///
/// An empty payload is a no-op that surfaces a warning and returns `None`;
/// actual encode or write failures are errors.
pub fn generate(payload: &str, out_dir: &Path) -> Result<Option<GeneratedQr>> {
    if payload.is_empty() {
        warn!("nothing to encode: select a product or enter text first");
        return Ok(None);
    }

    // EC level H tolerates print and scan degradation.
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
        .context("QR encoding failed")?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_PIXELS, MIN_PIXELS)
        .quiet_zone(true)
        .build();

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output dir: {}", out_dir.display()))?;
    let path = out_dir.join(format!("qr-{}.png", Utc::now().timestamp_millis()));
    img.save(&path)
        .with_context(|| format!("failed to write QR image: {}", path.display()))?;

    info!(path = %path.display(), bytes = payload.len(), "generated QR image");
    Ok(Some(GeneratedQr {
        path,
        payload: payload.to_string(),
    }))
}

/// Decode one captured frame. The first successfully decoded payload wins;
/// the caller replaces any previous result with it.
pub fn scan(path: &Path) -> Result<String> {
    let img = image::open(path)
        .with_context(|| format!("cannot open frame: {}", path.display()))?
        .to_luma8();
    let (width, height) = img.dimensions();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            img.get_pixel(x as u32, y as u32).0[0]
        });

    let grids = prepared.detect_grids();
    if grids.is_empty() {
        return Err(anyhow!("no QR code found in {}", path.display()));
    }
    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => return Ok(content),
            Err(err) => warn!(?err, "grid failed to decode, trying next"),
        }
    }
    Err(anyhow!("QR code detected but unreadable in {}", path.display()))
}
