use std::{path::PathBuf, time::SystemTime};

use anyhow::Context;

use crate::{
    data_structures::{cpu_texture::CpuTexture, texture},
    resources::{AssetRoot, load_binary},
};

pub async fn load_texture(
    root: &AssetRoot,
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(root, file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}

/// Keeps a texture in sync with an image file that may change while running.
///
/// The file is checked every `interval` frames and only decoded again when its
/// modification time moved. A failed reload keeps the texture that was
/// already loaded.
#[derive(Debug)]
pub struct TextureReloader {
    path: PathBuf,
    interval: u32,
    modified: Option<SystemTime>,
    texture: CpuTexture,
    reloads: u32,
}

impl TextureReloader {
    /// Load the file once. Unlike later reloads, the first load must succeed.
    pub fn new(root: &AssetRoot, file_name: &str, interval: u32) -> anyhow::Result<Self> {
        let path = root.resolve(file_name);
        let modified = modified_time(&path);
        let texture = decode(&path)?;
        Ok(Self {
            path,
            interval: interval.max(1),
            modified,
            texture,
            reloads: 0,
        })
    }

    pub fn texture(&self) -> &CpuTexture {
        &self.texture
    }

    /// Number of successful reloads since creation.
    pub fn reloads(&self) -> u32 {
        self.reloads
    }

    /// Returns true if the texture was replaced during this call.
    pub fn poll(&mut self, frame: u64) -> bool {
        if frame % self.interval as u64 != 0 {
            return false;
        }
        let modified = modified_time(&self.path);
        if modified.is_none() {
            log::warn!("{} is gone, keeping the last texture", self.path.display());
            return false;
        }
        if modified == self.modified {
            return false;
        }
        match decode(&self.path) {
            Ok(texture) => {
                log::debug!("Reloaded {}", self.path.display());
                self.texture = texture;
                self.modified = modified;
                self.reloads += 1;
                true
            }
            Err(e) => {
                log::warn!("Reloading {} failed, keeping the last texture: {e:#}", self.path.display());
                // don't retry the same broken file every interval
                self.modified = modified;
                false
            }
        }
    }
}

fn modified_time(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn decode(path: &std::path::Path) -> anyhow::Result<CpuTexture> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let image = image::load_from_memory(&data)
        .with_context(|| format!("decoding image {}", path.display()))?;
    Ok(CpuTexture::from_image(&image)?)
}
