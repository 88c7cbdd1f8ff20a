//! Separable Gaussian blur for 8-bit buffers of any channel count.
//!
//! Two passes (horizontal + vertical) for O(n*r) complexity instead of
//! O(n*r^2). Used to soften hull masks into glow falloff.
//!
//! # Algorithm
//!
//! 1. Build 1D Gaussian kernel for `sigma` (half-size = ceil(3 * sigma))
//! 2. Horizontal pass: convolve each row with kernel
//! 3. Vertical pass: convolve each column with kernel
//!
//! Edge pixels use clamped sampling, so a mask touching the border stays
//! solid at the border instead of darkening.

use super::frame::RasterBuffer;

/// Build 1D Gaussian kernel for given sigma.
///
/// Kernel size = 2*ceil(3*sigma) + 1, values normalized to sum to 1.0.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma.max(0.1);
    let half_size = (sigma * 3.0).ceil() as i32;
    let size = (half_size * 2 + 1) as usize;
    let sigma2 = sigma * sigma;

    let mut kernel = Vec::with_capacity(size);
    let mut sum = 0.0;

    for i in 0..size as i32 {
        let x = (i - half_size) as f32;
        let weight = (-x * x / (2.0 * sigma2)).exp();
        kernel.push(weight);
        sum += weight;
    }

    for w in &mut kernel {
        *w /= sum;
    }

    kernel
}

/// Blur every channel of `src` with an isotropic Gaussian of `sigma` pixels.
///
/// Returns a copy for empty buffers or non-positive sigma.
pub fn gaussian_blur(src: &RasterBuffer, sigma: f32) -> RasterBuffer {
    if src.is_empty() || sigma <= 0.0 {
        return src.clone();
    }

    let (width, height) = src.resolution();
    let ch = src.channels();
    let kernel = gaussian_kernel(sigma);

    let src_f32: Vec<f32> = src.data().iter().map(|&v| v as f32).collect();
    let temp = convolve_horizontal(&src_f32, width, height, ch, &kernel);
    let result = convolve_vertical(&temp, width, height, ch, &kernel);

    let mut out = RasterBuffer::new(width, height, src.format());
    for (dst, v) in out.data_mut().iter_mut().zip(result) {
        *dst = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Horizontal convolution pass.
fn convolve_horizontal(src: &[f32], width: usize, height: usize, ch: usize, kernel: &[f32]) -> Vec<f32> {
    let mut dst = vec![0.0f32; src.len()];
    let half = (kernel.len() / 2) as i32;

    for y in 0..height {
        for x in 0..width {
            let dst_idx = (y * width + x) * ch;
            for (ki, &weight) in kernel.iter().enumerate() {
                let sx = (x as i32 + ki as i32 - half).clamp(0, width as i32 - 1) as usize;
                let idx = (y * width + sx) * ch;
                for c in 0..ch {
                    dst[dst_idx + c] += src[idx + c] * weight;
                }
            }
        }
    }

    dst
}

/// Vertical convolution pass.
fn convolve_vertical(src: &[f32], width: usize, height: usize, ch: usize, kernel: &[f32]) -> Vec<f32> {
    let mut dst = vec![0.0f32; src.len()];
    let half = (kernel.len() / 2) as i32;

    for y in 0..height {
        for x in 0..width {
            let dst_idx = (y * width + x) * ch;
            for (ki, &weight) in kernel.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - half).clamp(0, height as i32 - 1) as usize;
                let idx = (sy * width + x) * ch;
                for c in 0..ch {
                    dst[dst_idx + c] += src[idx + c] * weight;
                }
            }
        }
    }

    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::PixelFormat;

    #[test]
    fn test_gaussian_kernel() {
        let kernel = gaussian_kernel(2.0);

        assert!(kernel.len() % 2 == 1);
        assert_eq!(kernel.len(), 13);

        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 0.001);

        let center = kernel.len() / 2;
        assert!(kernel[center] > kernel[0]);
        assert!(kernel[center] > kernel[kernel.len() - 1]);
    }

    #[test]
    fn test_constant_image_unchanged() {
        let src = RasterBuffer::filled(12, 7, PixelFormat::Rgb8, &[40, 80, 120]);
        let out = gaussian_blur(&src, 3.0);
        assert_eq!(out, src);
    }

    #[test]
    fn test_point_spreads_symmetrically() {
        let mut src = RasterBuffer::new(11, 11, PixelFormat::Gray8);
        src.pixel_mut(5, 5)[0] = 255;
        let out = gaussian_blur(&src, 1.0);
        assert!(out.pixel(5, 5)[0] < 255);
        assert!(out.pixel(4, 5)[0] > 0);
        assert_eq!(out.pixel(4, 5), out.pixel(6, 5));
        assert_eq!(out.pixel(5, 4), out.pixel(5, 6));
        assert_eq!(out.pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_zero_sigma_noop() {
        let mut src = RasterBuffer::new(3, 3, PixelFormat::Gray8);
        src.pixel_mut(1, 1)[0] = 9;
        assert_eq!(gaussian_blur(&src, 0.0), src);
    }
}
