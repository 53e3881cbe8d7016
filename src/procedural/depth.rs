//! Lifting 2D images into 2.5D geometry.
//!
//! A depth map is estimated from a rectified stereo pair with block matching
//! along scanlines, then turned into a displaced grid mesh.

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::data_structures::mesh::{self, Mesh, ModelVertex};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DepthError {
    #[error("images differ in size: {0:?} vs {1:?}")]
    SizeMismatch((u32, u32), (u32, u32)),
    #[error("image is empty")]
    EmptyImage,
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

fn check_positive(name: &'static str, value: f32) -> Result<(), DepthError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DepthError::InvalidParameter { name, value })
    }
}

/// Resample `image` as seen by a pinhole camera with focal lengths `fx, fy`
/// when the source was captured with focal lengths `cx, cy`.
///
/// The output is `fx / cx` times wider and `fy / cy` times taller. Output
/// pixels whose source falls outside the image stay transparent.
pub fn perspective_warp(
    image: &RgbaImage,
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
) -> Result<RgbaImage, DepthError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DepthError::EmptyImage);
    }
    check_positive("fx", fx)?;
    check_positive("fy", fy)?;
    check_positive("cx", cx)?;
    check_positive("cy", cy)?;

    let width = ((image.width() as f32 * fx / cx).round() as u32).max(1);
    let height = ((image.height() as f32 * fy / cy).round() as u32).max(1);
    Ok(RgbaImage::from_fn(width, height, |x, y| {
        let sx = ((x as f32 + 0.5) * cx / fx).floor();
        let sy = ((y as f32 + 0.5) * cy / fy).floor();
        if sx < 0.0 || sy < 0.0 || sx >= image.width() as f32 || sy >= image.height() as f32 {
            Rgba([0, 0, 0, 0])
        } else {
            *image.get_pixel(sx as u32, sy as u32)
        }
    }))
}

/// Disparity map of a rectified stereo pair, scaled so that `max_disparity`
/// maps to 255. Larger values are closer to the camera.
///
/// For every pixel of `left` the best match along the same row of `right`
/// is found by minimising the sum of absolute differences over a square
/// window of radius `window`. Ties go to the smaller disparity.
pub fn estimate_depth(
    left: &GrayImage,
    right: &GrayImage,
    max_disparity: u32,
    window: u32,
) -> Result<GrayImage, DepthError> {
    if left.dimensions() != right.dimensions() {
        return Err(DepthError::SizeMismatch(left.dimensions(), right.dimensions()));
    }
    let (width, height) = left.dimensions();
    if width == 0 || height == 0 {
        return Err(DepthError::EmptyImage);
    }
    let max_disparity = max_disparity.max(1);
    let w = window as i64;
    let at = |img: &GrayImage, x: i64, y: i64| {
        let x = x.clamp(0, width as i64 - 1) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        img.get_pixel(x, y).0[0] as i64
    };

    let mut out = GrayImage::new(width, height);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let mut best = (i64::MAX, 0u32);
            for d in 0..=max_disparity.min(x as u32) {
                let mut sad = 0;
                for dy in -w..=w {
                    for dx in -w..=w {
                        sad += (at(left, x + dx, y + dy) - at(right, x + dx - d as i64, y + dy)).abs();
                    }
                }
                if sad < best.0 {
                    best = (sad, d);
                }
            }
            let value = (best.1 as f32 / max_disparity as f32 * 255.0).round() as u8;
            out.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }
    Ok(out)
}

/// A relief facing +z: one vertex per pixel, spaced `scale_xy` apart, pushed
/// forward by `depth / 255 * scale_z`.
pub fn heightmap_mesh(depth: &GrayImage, scale_xy: f32, scale_z: f32) -> Result<Mesh, DepthError> {
    let (width, height) = depth.dimensions();
    if width < 2 || height < 2 {
        return Err(DepthError::EmptyImage);
    }
    let mut mesh = Mesh::new("heightmap");
    let half_w = (width - 1) as f32 / 2.0;
    let half_h = (height - 1) as f32 / 2.0;
    for y in 0..height {
        for x in 0..width {
            let z = depth.get_pixel(x, y).0[0] as f32 / 255.0 * scale_z;
            mesh.vertices.push(ModelVertex::new(
                [
                    (x as f32 - half_w) * scale_xy,
                    (half_h - y as f32) * scale_xy,
                    z,
                ],
                [
                    x as f32 / (width - 1) as f32,
                    y as f32 / (height - 1) as f32,
                ],
            ));
        }
    }
    mesh.indices = mesh::grid_indices(width - 1, height - 1);
    mesh.compute_normals();
    mesh.compute_tangents();
    Ok(mesh)
}
