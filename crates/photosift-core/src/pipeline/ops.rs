//! Low-level image operations shared by the signal scorers and the feature
//! extractor.
//!
//! Everything here works on an 8-bit-scaled (0..255) grayscale plane stored
//! as `f32`, so variance magnitudes line up with the configured absolute
//! sharpness bounds.

use image::RgbImage;

/// 3x3 Laplacian kernel.
pub const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Horizontal line response kernel.
pub const MOTION_HORIZONTAL: [f32; 9] = [-1.0, -1.0, -1.0, 2.0, 2.0, 2.0, -1.0, -1.0, -1.0];

/// Vertical line response kernel.
pub const MOTION_VERTICAL: [f32; 9] = [-1.0, 2.0, -1.0, -1.0, 2.0, -1.0, -1.0, 2.0, -1.0];

const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// A grayscale plane with 0..255-scaled `f32` samples.
#[derive(Debug, Clone)]
pub struct GrayBuffer {
    pub width: u32,
    pub height: u32,
    data: Vec<f32>,
}

/// An axis-aligned pixel region, clamped to the image on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

impl GrayBuffer {
    /// Convert an RGB image to grayscale via BT.601 luma.
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0;
            data.push(0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b));
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[cfg(test)]
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y * self.width + x) as usize]
    }

    /// Sample with edge clamping, for kernel application at borders.
    #[inline]
    fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let cx = x.clamp(0, i64::from(self.width) - 1) as u32;
        let cy = y.clamp(0, i64::from(self.height) - 1) as u32;
        self.get(cx, cy)
    }

    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Apply a 3x3 kernel with edge clamping.
    pub fn convolve3x3(&self, kernel: &[f32; 9]) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for y in 0..i64::from(self.height) {
            for x in 0..i64::from(self.width) {
                let mut acc = 0.0f32;
                for ky in 0..3i64 {
                    for kx in 0..3i64 {
                        acc += kernel[(ky * 3 + kx) as usize]
                            * self.get_clamped(x + kx - 1, y + ky - 1);
                    }
                }
                out.push(acc);
            }
        }
        out
    }

    /// Laplacian response over the full plane.
    pub fn laplacian(&self) -> Vec<f32> {
        self.convolve3x3(&LAPLACIAN)
    }

    /// Variance of the Laplacian response — the raw sharpness magnitude.
    pub fn laplacian_variance(&self) -> f64 {
        variance(&self.laplacian())
    }

    /// Sobel gradient magnitude per pixel.
    pub fn sobel_magnitude(&self) -> Vec<f32> {
        let gx = self.convolve3x3(&SOBEL_X);
        let gy = self.convolve3x3(&SOBEL_Y);
        gx.iter()
            .zip(gy.iter())
            .map(|(x, y)| (x * x + y * y).sqrt())
            .collect()
    }

    /// Fraction of pixels whose gradient magnitude exceeds `threshold`.
    ///
    /// A coarse stand-in for a hysteresis edge detector: good enough for the
    /// density heuristics the scorers use.
    pub fn edge_density(&self, threshold: f32) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        let magnitude = self.sobel_magnitude();
        let edges = magnitude.iter().filter(|m| **m > threshold).count();
        edges as f64 / magnitude.len() as f64
    }

    /// Mean and population standard deviation of the samples in a region.
    pub fn region_mean_std(&self, region: Region) -> (f64, f64) {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for y in region.y..(region.y + region.height).min(self.height) {
            for x in region.x..(region.x + region.width).min(self.width) {
                sum += f64::from(self.get(x, y));
                count += 1;
            }
        }
        if count == 0 {
            return (0.0, 0.0);
        }
        let mean = sum / count as f64;
        let mut var = 0.0f64;
        for y in region.y..(region.y + region.height).min(self.height) {
            for x in region.x..(region.x + region.width).min(self.width) {
                let d = f64::from(self.get(x, y)) - mean;
                var += d * d;
            }
        }
        (mean, (var / count as f64).sqrt())
    }

    /// Fraction of the plane covered by low-variance cells, measured over a
    /// grid of `cell` x `cell` blocks.
    pub fn uniform_area_fraction(&self, cell: u32, variance_cutoff: f64) -> f64 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let mut uniform = 0usize;
        let mut total = 0usize;
        let mut y = 0;
        while y < self.height {
            let mut x = 0;
            while x < self.width {
                let region = Region::new(
                    x,
                    y,
                    cell.min(self.width - x),
                    cell.min(self.height - y),
                );
                let (_, std) = self.region_mean_std(region);
                if std * std < variance_cutoff {
                    uniform += 1;
                }
                total += 1;
                x += cell;
            }
            y += cell;
        }
        if total == 0 {
            0.0
        } else {
            uniform as f64 / total as f64
        }
    }
}

/// Population variance of a sample.
pub fn variance(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64;
    values
        .iter()
        .map(|v| {
            let d = f64::from(*v) - mean;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64
}

/// Variance of the masked samples: `response` values where `mask` holds.
pub fn masked_variance(response: &[f32], mask: impl Fn(usize) -> bool) -> f64 {
    let selected: Vec<f32> = response
        .iter()
        .enumerate()
        .filter(|(i, _)| mask(*i))
        .map(|(_, v)| *v)
        .collect();
    variance(&selected)
}

/// 16-bin histogram of one RGB channel, normalized by pixel count.
pub fn channel_histogram(rgb: &RgbImage, channel: usize) -> [f32; 16] {
    let mut bins = [0u32; 16];
    for pixel in rgb.pixels() {
        bins[(pixel.0[channel] / 16) as usize] += 1;
    }
    let total = rgb.width() * rgb.height();
    let mut out = [0.0f32; 16];
    if total > 0 {
        for (o, b) in out.iter_mut().zip(bins.iter()) {
            *o = *b as f32 / total as f32;
        }
    }
    out
}

/// Per-channel variance of an RGB image (0..255 scale).
pub fn channel_variances(rgb: &RgbImage) -> [f64; 3] {
    let mut out = [0.0f64; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let samples: Vec<f32> = rgb.pixels().map(|p| f32::from(p.0[c])).collect();
        *slot = variance(&samples);
    }
    out
}
