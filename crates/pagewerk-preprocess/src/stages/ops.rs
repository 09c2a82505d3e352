// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared low-level image operations used by several stages.

use image::{GrayImage, Luma};
use imageproc::filter::separable_filter_equal;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

// -- Gaussian -----------------------------------------------------------------

/// Normalised 1-D gaussian kernel of odd length `ksize`.
///
/// A non-positive `sigma` is derived from the kernel size as
/// `0.3 * ((ksize - 1) / 2 - 1) + 0.8`.
pub(crate) fn gaussian_kernel(ksize: u32, sigma: f64) -> Vec<f32> {
    let ksize = ksize.max(1) | 1;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let centre = (ksize / 2) as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - centre;
            (-(d * d) / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel.into_iter().map(|k| k as f32).collect()
}

/// Separable gaussian blur with an explicit kernel size.
pub(crate) fn gaussian_blur(image: &GrayImage, ksize: u32, sigma: f64) -> GrayImage {
    let kernel = gaussian_kernel(ksize, sigma);
    separable_filter_equal(image, &kernel)
}

// -- Morphology ---------------------------------------------------------------

/// A one-pixel row and column mask; applied in turn they cover a
/// `size` x `size` square. Masks are capped at 511 px with a `u8` centre.
fn line_masks(size: u32) -> (Mask, Mask) {
    let size = size.clamp(1, 511) | 1;
    let centre = (size / 2) as u8;
    let row = Mask::from_image(&GrayImage::from_pixel(size, 1, Luma([255])), centre, 0);
    let column = Mask::from_image(&GrayImage::from_pixel(1, size, Luma([255])), 0, centre);
    (row, column)
}

/// Grayscale dilation with a `size` x `size` square structuring element.
pub(crate) fn dilate(image: &GrayImage, size: u32) -> GrayImage {
    let (row, column) = line_masks(size);
    grayscale_dilate(&grayscale_dilate(image, &row), &column)
}

/// Grayscale erosion with a `size` x `size` square structuring element.
pub(crate) fn erode(image: &GrayImage, size: u32) -> GrayImage {
    let (row, column) = line_masks(size);
    grayscale_erode(&grayscale_erode(image, &row), &column)
}

// -- Normalisation ------------------------------------------------------------

/// Stretch arbitrary float samples linearly onto 0..=255.
///
/// A flat input has no range to stretch; it is clamped and rounded instead.
pub(crate) fn minmax_to_gray(width: u32, height: u32, values: &[f32]) -> GrayImage {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = hi - lo;
    let pixels: Vec<u8> = if !range.is_finite() || range < 1e-6 {
        values.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8).collect()
    } else {
        let scale = 255.0 / range;
        values
            .iter()
            .map(|&v| ((v - lo) * scale).round().clamp(0.0, 255.0) as u8)
            .collect()
    };
    GrayImage::from_raw(width, height, pixels).unwrap_or_else(|| GrayImage::new(width, height))
}

pub(crate) fn mean(image: &GrayImage) -> f64 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    image.as_raw().iter().map(|&v| v as u64).sum::<u64>() as f64 / count as f64
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
pub(crate) fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value of the square window of `radius` around (cx, cy),
/// clipped to the image.
pub(crate) fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(7, 1.5);
        assert_eq!(k.len(), 7);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((k[0] - k[6]).abs() < 1e-7);
        assert!(k[3] > k[2]);
    }

    #[test]
    fn gaussian_kernel_derives_sigma() {
        let k = gaussian_kernel(5, 0.0);
        assert_eq!(k.len(), 5);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn blur_keeps_flat_image_flat() {
        let img = GrayImage::from_pixel(12, 9, Luma([90]));
        let out = gaussian_blur(&img, 5, 1.0);
        // Float accumulation may land a hair under the true value.
        assert!(out.pixels().all(|p| p.0[0].abs_diff(90) <= 1));
    }

    #[test]
    fn dilate_spreads_bright_pixel_over_window() {
        let mut img = GrayImage::from_pixel(9, 9, Luma([0]));
        img.put_pixel(4, 4, Luma([200]));
        let out = dilate(&img, 3);
        for y in 0..9 {
            for x in 0..9 {
                let inside = (3..=5).contains(&x) && (3..=5).contains(&y);
                assert_eq!(out.get_pixel(x, y).0[0], if inside { 200 } else { 0 }, "({x},{y})");
            }
        }
    }

    #[test]
    fn erode_removes_thin_dark_line() {
        let mut img = GrayImage::from_pixel(10, 10, Luma([255]));
        for y in 0..10 {
            img.put_pixel(5, y, Luma([0]));
        }
        // Closing (dilate then erode) fills a one-pixel dark line.
        let closed = erode(&dilate(&img, 3), 3);
        assert!(closed.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn square_erosion_matches_naive_window_minimum() {
        let img = GrayImage::from_fn(11, 8, |x, y| Luma([((x * 37 + y * 91) % 251) as u8]));
        let out = erode(&img, 5);
        for y in 0..8i64 {
            for x in 0..11i64 {
                let naive = (y - 2..=y + 2)
                    .flat_map(|wy| (x - 2..=x + 2).map(move |wx| (wx, wy)))
                    .filter(|&(wx, wy)| (0..11).contains(&wx) && (0..8).contains(&wy))
                    .map(|(wx, wy)| img.get_pixel(wx as u32, wy as u32).0[0])
                    .min()
                    .unwrap();
                assert_eq!(out.get_pixel(x as u32, y as u32).0[0], naive, "({x},{y})");
            }
        }
    }

    #[test]
    fn oversized_kernel_is_capped() {
        let img = GrayImage::from_pixel(4, 4, Luma([9]));
        assert_eq!(dilate(&img, 10_000), img);
    }

    #[test]
    fn minmax_stretches_full_range() {
        let out = minmax_to_gray(3, 1, &[10.0, 20.0, 30.0]);
        assert_eq!(out.as_raw(), &vec![0, 128, 255]);
        let flat = minmax_to_gray(2, 1, &[77.0, 77.0]);
        assert_eq!(flat.as_raw(), &vec![77, 77]);
    }

    #[test]
    fn region_mean_over_uniform_image() {
        let img = GrayImage::from_pixel(6, 6, Luma([40]));
        let integral = compute_integral_image(&img);
        assert!((region_mean(&integral, 6, 6, 0, 0, 2) - 40.0).abs() < 1e-9);
        assert!((region_mean(&integral, 6, 6, 3, 3, 10) - 40.0).abs() < 1e-9);
    }
}
