// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page loader — decodes a page source into an 8-bit grayscale working image,
// upright per its EXIF orientation and downscaled so no stage ever sees more
// than a fixed long side.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageReader, ImageResult};
use pagewerk_core::{PageSource, PipelineError, Result};
use tracing::{debug, info, instrument};

/// Longest side, in pixels, a working image may have.
pub const MAX_LONG_SIDE: u32 = 3000;

/// Load a page from wherever its source points.
pub fn load_page(source: &PageSource) -> Result<GrayImage> {
    match source {
        PageSource::Path(path) => open(path),
        PageSource::Bytes(bytes) => decode_bytes(bytes),
    }
}

/// Decode encoded bytes (PNG, JPEG, TIFF, BMP, ...) into a capped grayscale image.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_bytes(data: &[u8]) -> Result<GrayImage> {
    let img = decode_upright(ImageReader::new(Cursor::new(data))).map_err(|err| {
        PipelineError::DecodeFailure(format!("failed to decode image: {}", err))
    })?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    Ok(to_working_gray(img))
}

#[instrument(skip_all, fields(path = %path.display()))]
fn open(path: &Path) -> Result<GrayImage> {
    let img = ImageReader::open(path)
        .map_err(image::ImageError::from)
        .and_then(decode_upright)
        .map_err(|err| {
            PipelineError::DecodeFailure(format!("failed to open {}: {}", path.display(), err))
        })?;
    info!(width = img.width(), height = img.height(), "Page image loaded");
    Ok(to_working_gray(img))
}

/// Decode and apply the EXIF orientation, so camera pages come out upright.
fn decode_upright<R: BufRead + Seek>(reader: ImageReader<R>) -> ImageResult<DynamicImage> {
    let mut decoder = reader.with_guessed_format()?.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)?;
    if orientation != Orientation::NoTransforms {
        debug!(?orientation, "Applying EXIF orientation");
        img.apply_orientation(orientation);
    }
    Ok(img)
}

/// Apply the long-side cap (Lanczos3, aspect preserved) and convert to luma.
fn to_working_gray(img: DynamicImage) -> GrayImage {
    let long_side = img.width().max(img.height());
    let img = if long_side > MAX_LONG_SIDE {
        let resized = img.resize(MAX_LONG_SIDE, MAX_LONG_SIDE, FilterType::Lanczos3);
        debug!(
            from = long_side,
            new_w = resized.width(),
            new_h = resized.height(),
            "Downscaled oversized page"
        );
        resized
    } else {
        img
    };
    img.to_luma8()
}
