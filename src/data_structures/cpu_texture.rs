//! CPU side textures with filtering and wrapping.
//!
//! Used wherever colours are needed without a GPU: blending textures,
//! sampling skybox faces and building procedural images.

use cgmath::{Vector2, Vector4};
use image::{DynamicImage, Rgba, RgbaImage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    Clamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Bilinear,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TextureError {
    #[error("texture sizes differ: {0:?} vs {1:?}")]
    SizeMismatch((u32, u32), (u32, u32)),
    #[error("texture must not be empty")]
    Empty,
}

/// An RGBA8 image that can be sampled with normalised texture coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct CpuTexture {
    image: RgbaImage,
}

impl CpuTexture {
    pub fn new(image: RgbaImage) -> Result<Self, TextureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::Empty);
        }
        Ok(Self { image })
    }

    pub fn from_image(image: &DynamicImage) -> Result<Self, TextureError> {
        Self::new(image.to_rgba8())
    }

    pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(colour)),
        }
    }

    /// Checkerboard with square cells of `cell` pixels.
    pub fn checker(width: u32, height: u32, cell: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = cell.max(1);
        Self {
            image: RgbaImage::from_fn(width.max(1), height.max(1), |x, y| {
                if ((x / cell) + (y / cell)) % 2 == 0 { Rgba(a) } else { Rgba(b) }
            }),
        }
    }

    /// Horizontal ramp from `left` to `right`, interpolated per column.
    pub fn gradient_x(width: u32, height: u32, left: Vector4<f32>, right: Vector4<f32>) -> Self {
        let width = width.max(1);
        let denom = (width - 1).max(1) as f32;
        Self {
            image: RgbaImage::from_fn(width, height.max(1), |x, _| {
                to_rgba(lerp(left, right, x as f32 / denom))
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Texel at integer coordinates as normalised floats.
    pub fn texel(&self, x: u32, y: u32) -> Vector4<f32> {
        to_vec(*self.image.get_pixel(x, y))
    }

    /// Sample at `uv` in texture space, `(0, 0)` is the top-left corner.
    pub fn sample(&self, uv: Vector2<f32>, filter: Filter, wrap: WrapMode) -> Vector4<f32> {
        let (w, h) = (self.width() as f32, self.height() as f32);
        match filter {
            Filter::Nearest => {
                let x = self.wrap_coord((uv.x * w).floor() as i64, self.width(), wrap);
                let y = self.wrap_coord((uv.y * h).floor() as i64, self.height(), wrap);
                self.texel(x, y)
            }
            Filter::Bilinear => {
                // texel centres sit at half-integer coordinates
                let fx = uv.x * w - 0.5;
                let fy = uv.y * h - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let xa = self.wrap_coord(x0 as i64, self.width(), wrap);
                let xb = self.wrap_coord(x0 as i64 + 1, self.width(), wrap);
                let ya = self.wrap_coord(y0 as i64, self.height(), wrap);
                let yb = self.wrap_coord(y0 as i64 + 1, self.height(), wrap);
                let top = lerp(self.texel(xa, ya), self.texel(xb, ya), tx);
                let bottom = lerp(self.texel(xa, yb), self.texel(xb, yb), tx);
                lerp(top, bottom, ty)
            }
        }
    }

    fn wrap_coord(&self, c: i64, size: u32, wrap: WrapMode) -> u32 {
        let size = size as i64;
        match wrap {
            WrapMode::Repeat => c.rem_euclid(size) as u32,
            WrapMode::Clamp => c.clamp(0, size - 1) as u32,
        }
    }

    /// Per-texel blend of two equally sized textures.
    pub fn blend(a: &CpuTexture, b: &CpuTexture, t: f32) -> Result<CpuTexture, TextureError> {
        if a.dimensions() != b.dimensions() {
            return Err(TextureError::SizeMismatch(a.dimensions(), b.dimensions()));
        }
        let image = RgbaImage::from_fn(a.width(), a.height(), |x, y| {
            to_rgba(lerp(a.texel(x, y), b.texel(x, y), t))
        });
        Ok(CpuTexture { image })
    }
}

/// Linear interpolation between two colours; `t` is clamped to [0, 1].
pub fn lerp(a: Vector4<f32>, b: Vector4<f32>, t: f32) -> Vector4<f32> {
    let t = t.clamp(0.0, 1.0);
    a * (1.0 - t) + b * t
}

pub fn to_vec(p: Rgba<u8>) -> Vector4<f32> {
    Vector4::new(
        p.0[0] as f32 / 255.0,
        p.0[1] as f32 / 255.0,
        p.0[2] as f32 / 255.0,
        p.0[3] as f32 / 255.0,
    )
}

pub fn to_rgba(c: Vector4<f32>) -> Rgba<u8> {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([q(c.x), q(c.y), q(c.z), q(c.w)])
}
