#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use cgmath::Vector3;
use image::{Rgba, RgbaImage};
use futures::executor::block_on;
use polysketch::{
    context::GpuContext,
    data_structures::mesh::{Mesh, ModelVertex},
    init_logging,
    resources::AssetRoot,
};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Logger plus a headless device for tests that talk to the GPU.
pub(crate) fn headless_context() -> GpuContext {
    init_logging();
    block_on(GpuContext::new_headless()).expect("no GPU adapter available")
}

/// A fresh directory below the system temp dir, removed again on drop.
pub(crate) struct TempAssets {
    dir: PathBuf,
}

impl TempAssets {
    pub fn new(name: &str) -> Self {
        init_logging();
        let dir = std::env::temp_dir().join(format!(
            "polysketch-{name}-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).expect("failed to create temp dir");
        Self { dir }
    }

    pub fn root(&self) -> AssetRoot {
        AssetRoot::new(&self.dir)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, file_name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.join(file_name);
        std::fs::write(&path, contents).expect("failed to write asset");
        path
    }

    pub fn write_png(&self, file_name: &str, image: &RgbaImage) -> PathBuf {
        let path = self.dir.join(file_name);
        image.save(&path).expect("failed to write png");
        path
    }
}

impl Drop for TempAssets {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub(crate) fn solid_image(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}

/// Two triangles sharing an edge, both facing +z.
pub(crate) fn two_triangles() -> Mesh {
    let mut mesh = Mesh::new("two_triangles");
    for p in [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ] {
        mesh.add_vertex(ModelVertex::new(p, [p[0], 1.0 - p[1]]));
    }
    mesh.add_triangle(0, 1, 2).unwrap();
    mesh.add_triangle(0, 2, 3).unwrap();
    mesh
}

/// Regular lattice of `n^3` points filling `[0, n)^3`.
pub(crate) fn lattice(n: usize) -> Vec<Vector3<f32>> {
    let mut points = Vec::with_capacity(n * n * n);
    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                points.push(Vector3::new(x as f32, y as f32, z as f32));
            }
        }
    }
    points
}

/// Indices of points within `radius` of `center`, by brute force, sorted.
pub(crate) fn brute_force_radius(points: &[Vector3<f32>], center: Vector3<f32>, radius: f32) -> Vec<usize> {
    use cgmath::InnerSpace;
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| (*p - center).magnitude2() <= radius * radius)
        .map(|(i, _)| i)
        .collect()
}

pub(crate) fn sorted(mut ids: Vec<usize>) -> Vec<usize> {
    ids.sort_unstable();
    ids
}
