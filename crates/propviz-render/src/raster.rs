//! RGBA raster with a floating-point coverage channel.
//!
//! Stamps accumulate into `coverage` with source-over compositing; the
//! colorize pass then writes the final RGBA bytes from it.

/// A `width x height` RGBA8 image plus per-pixel accumulated alpha.
#[derive(Debug, Clone, Default)]
pub struct Raster {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    coverage: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            rgba: vec![0; n * 4],
            coverage: vec![0.0; n],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when either dimension is zero; nothing can be drawn.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate to a new size. Contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            *self = Self::new(width, height);
        } else {
            self.clear();
        }
    }

    /// Fully transparent.
    pub fn clear(&mut self) {
        self.rgba.fill(0);
        self.coverage.fill(0.0);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Source-over composite of coverage `a` onto pixel `(x, y)`.
    /// Out-of-bounds pixels are ignored.
    pub fn blend(&mut self, x: i64, y: i64, a: f32) {
        if let Some(i) = self.index(x, y) {
            let dst = self.coverage[i];
            self.coverage[i] = a + dst * (1.0 - a);
        }
    }

    /// Accumulated coverage at `(x, y)`, 0 outside the raster.
    pub fn coverage(&self, x: i64, y: i64) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.coverage[i])
    }

    /// Quantize coverage to 8-bit alpha and map each covered pixel to a color.
    /// Pixels whose quantized alpha is zero stay fully transparent.
    pub fn colorize(&mut self, color_for: impl Fn(f64) -> [u8; 3]) {
        for (i, &c) in self.coverage.iter().enumerate() {
            let byte = (f64::from(c) * 255.0).round().clamp(0.0, 255.0) as u8;
            let px = &mut self.rgba[i * 4..i * 4 + 4];
            if byte == 0 {
                px.fill(0);
                continue;
            }
            let a = f64::from(byte) / 255.0;
            let [r, g, b] = color_for(a);
            px.copy_from_slice(&[r, g, b, byte]);
        }
    }

    /// RGBA bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.index(i64::from(x), i64::from(y))?;
        let px = &self.rgba[i * 4..i * 4 + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Row-major RGBA8 buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.rgba
    }

    /// Number of pixels with non-zero output alpha.
    pub fn painted_pixels(&self) -> usize {
        self.rgba.chunks_exact(4).filter(|px| px[3] > 0).count()
    }
}
