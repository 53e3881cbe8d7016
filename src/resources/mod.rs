//! Loading meshes, images and raw files from disk.
//!
//! Every path is resolved against an [`AssetRoot`]. Loaders never hand back a
//! placeholder on failure: a missing or unreadable file is an error carrying
//! the resolved path.
//!
//! - `mesh` converts `.obj` models into [`Mesh`]es
//! - `texture` decodes images and hot-reloads textures that change on disk

use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::data_structures::mesh::Mesh;

pub mod mesh;
pub mod texture;

/// Directory all asset file names are relative to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute file names are returned unchanged.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::new(Path::new("./").join("assets"))
    }
}

pub async fn load_string(root: &AssetRoot, file_name: &str) -> anyhow::Result<String> {
    let path = root.resolve(file_name);
    std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
}

pub async fn load_binary(root: &AssetRoot, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = root.resolve(file_name);
    std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
}

/// Decode an image file; the format is guessed from the file contents.
pub async fn load_image(root: &AssetRoot, file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(root, file_name).await?;
    image::load_from_memory(&data)
        .with_context(|| format!("decoding image {}", root.resolve(file_name).display()))
}

/// Load every model of an `.obj` file as a separate mesh.
///
/// Faces are triangulated and a single index buffer is used for positions,
/// normals and texture coordinates. Referenced `.mtl` files are optional.
#[allow(deprecated)]
pub async fn load_mesh_obj(root: &AssetRoot, file_name: &str) -> anyhow::Result<Vec<Mesh>> {
    let obj_text = load_string(root, file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            match load_string(root, &p).await {
                Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                Err(e) => {
                    log::warn!("Material file {p} referenced by {file_name} is unavailable: {e:#}");
                    Err(tobj::LoadError::OpenFileFailed)
                }
            }
        },
    )
    .await
    .with_context(|| format!("parsing {}", root.resolve(file_name).display()))?;

    if let Err(e) = materials {
        log::debug!("{file_name} is used without materials: {e}");
    }

    let meshes: Vec<Mesh> = mesh::convert_models(&models, file_name)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, result)| match result {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                log::warn!("Mesh at index {idx} in file {file_name} was skipped: {e}");
                None
            }
        })
        .collect();
    log::debug!("Loaded {} meshes from {file_name}", meshes.len());
    Ok(meshes)
}
