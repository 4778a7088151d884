//! Pairing code rendering (PNG and data URL).

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;

/// Minimum rendered edge in pixels
const MIN_DIMENSION: u32 = 256;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Failed to encode pairing code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Failed to render pairing image: {0}")]
    Image(#[from] image::ImageError),
}

/// The one-time code a user scans to authenticate the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPayload {
    code: String,
}

impl PairingPayload {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Render the code as a PNG QR image
    pub fn to_png(&self) -> Result<Vec<u8>, PairingError> {
        let qr = QrCode::new(self.code.as_bytes())?;
        let image = qr
            .render::<Luma<u8>>()
            .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
            .build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// `data:image/png;base64,...`
    pub fn to_data_url(&self) -> Result<String, PairingError> {
        let png = self.to_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}
