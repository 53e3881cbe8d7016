//! Offscreen rendering.
//!
//! Meshes are uploaded once as [`GpuMesh`] and drawn with GPU instancing: all
//! placements of the same mesh are grouped into one [`DrawBatch`] and issued as
//! a single instanced draw call. The frame is rendered into a texture and
//! copied back into an [`image::RgbaImage`].
//!
//! # Key types
//!
//! - [`RenderConfig`] holds image size, clear colour and projection settings
//! - [`GpuMesh`] owns the vertex and index buffers of one mesh
//! - [`DrawBatch`] lists the instances of one mesh for a single draw call
//! - [`OffscreenRenderer`] owns the pipelines and targets and produces images
//!
//! An optional [`Skybox`] set with [`OffscreenRenderer::set_skybox`] replaces
//! the clear colour as background.
//!

use std::iter;

use anyhow::Context;
use cgmath::{Deg, Rad};
use image::{DynamicImage, RgbaImage};
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, CameraUniform, Projection},
    context::GpuContext,
    data_structures::{
        cpu_texture::CpuTexture, instance::Instance, mesh::Mesh, skybox::Skybox, texture::Texture,
    },
    pipelines::{
        basic::{camera_layout, diffuse_layout, mk_mesh_pipeline},
        skybox::{SkyUniform, cube_layout, mk_skybox_pipeline},
    },
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub clear: wgpu::Color,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            clear: wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
            fovy: Deg(45.0).into(),
            znear: 0.1,
            zfar: 500.0,
        }
    }
}

/// Vertex and index buffers of one mesh.
#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    /// Diffuse texture bind group. Drawn plain white without one.
    pub material: Option<wgpu::BindGroup>,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: mesh.name.clone(),
            vertex_buffer,
            index_buffer,
            num_indices: mesh.indices.len() as u32,
            material: None,
        }
    }
}

/// All instances of one mesh, drawn with a single call.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawBatch {
    pub mesh_id: usize,
    pub instances: Vec<Instance>,
}

/// Group `(mesh_id, instance)` pairs by mesh, in order of first appearance.
pub fn batch_instances(items: &[(usize, Instance)]) -> Vec<DrawBatch> {
    let mut batches: Vec<DrawBatch> = Vec::new();
    for (mesh_id, instance) in items {
        match batches.iter_mut().find(|b| b.mesh_id == *mesh_id) {
            Some(batch) => batch.instances.push(*instance),
            None => batches.push(DrawBatch {
                mesh_id: *mesh_id,
                instances: vec![*instance],
            }),
        }
    }
    batches
}

/// Bytes per texture row after padding to what buffer copies require.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the row padding of a texture copy.
pub fn unpad_rows(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let padded = padded_bytes_per_row(width) as usize;
    let unpadded = width as usize * 4;
    data.chunks(padded)
        .take(height as usize)
        .flat_map(|row| &row[..unpadded.min(row.len())])
        .copied()
        .collect()
}

pub struct OffscreenRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: RenderConfig,
    target: Texture,
    depth: Texture,
    pipeline: wgpu::RenderPipeline,
    diffuse_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    white: wgpu::BindGroup,
    sky_pipeline: wgpu::RenderPipeline,
    cube_layout: wgpu::BindGroupLayout,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,
    /// Cube map of the current skybox, if any.
    sky_cube: Option<wgpu::BindGroup>,
}

impl OffscreenRenderer {
    pub fn new(ctx: &GpuContext, config: RenderConfig) -> anyhow::Result<Self> {
        if config.width == 0 || config.height == 0 {
            anyhow::bail!("cannot render into a {}x{} image", config.width, config.height);
        }
        let device = &ctx.device;
        let camera_layout = camera_layout(device);
        let diffuse_layout = diffuse_layout(device);
        let pipeline = mk_mesh_pipeline(device, &camera_layout, &diffuse_layout);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let cube_layout = cube_layout(device);
        let sky_pipeline = mk_skybox_pipeline(device, &camera_layout, &cube_layout);
        let sky_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Buffer"),
            contents: bytemuck::cast_slice(&[SkyUniform {
                inv_view_proj: [[0.0; 4]; 4],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_buffer.as_entire_binding(),
            }],
            label: Some("sky_bind_group"),
        });

        let size = [config.width, config.height];
        let target = Texture::create_render_target(device, size, "offscreen_target");
        let depth = Texture::create_depth_texture(device, size, "offscreen_depth");

        let white = CpuTexture::solid(1, 1, [255, 255, 255, 255]);
        let white = Texture::from_image(
            device,
            &ctx.queue,
            &DynamicImage::ImageRgba8(white.into_image()),
            Some("white"),
            false,
        )?;
        let white = texture_bind_group(device, &diffuse_layout, &white)?;

        Ok(Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            config,
            target,
            depth,
            pipeline,
            diffuse_layout,
            camera_buffer,
            camera_bind_group,
            white,
            sky_pipeline,
            cube_layout,
            sky_buffer,
            sky_bind_group,
            sky_cube: None,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Draw `skybox` behind every following frame, or go back to the clear colour with `None`.
    pub fn set_skybox(&mut self, skybox: Option<&Skybox>) -> anyhow::Result<()> {
        self.sky_cube = match skybox {
            Some(skybox) => {
                let cube = Texture::cubemap_from_skybox(&self.device, &self.queue, skybox, "skybox");
                Some(texture_bind_group(&self.device, &self.cube_layout, &cube)?)
            }
            None => None,
        };
        Ok(())
    }

    pub fn has_skybox(&self) -> bool {
        self.sky_cube.is_some()
    }

    /// Upload a mesh, optionally with a diffuse texture.
    pub fn upload_mesh(&self, mesh: &Mesh, texture: Option<&CpuTexture>) -> anyhow::Result<GpuMesh> {
        let mut gpu_mesh = GpuMesh::upload(&self.device, mesh);
        if let Some(texture) = texture {
            let texture = Texture::from_image(
                &self.device,
                &self.queue,
                &DynamicImage::ImageRgba8(texture.image().clone()),
                Some(&mesh.name),
                false,
            )?;
            gpu_mesh.material = Some(texture_bind_group(&self.device, &self.diffuse_layout, &texture)?);
        }
        Ok(gpu_mesh)
    }

    /// Draw `batches` of `meshes` as seen by `camera` and read the frame back.
    ///
    /// Batches pointing at a mesh that does not exist are skipped with a warning.
    pub async fn render(
        &self,
        camera: &Camera,
        meshes: &[GpuMesh],
        batches: &[DrawBatch],
    ) -> anyhow::Result<RgbaImage> {
        let RenderConfig {
            width,
            height,
            clear,
            fovy,
            znear,
            zfar,
        } = self.config;
        let projection = Projection::new(width, height, fovy, znear, zfar);
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(camera, &projection);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniform]));
        if self.sky_cube.is_some() {
            let sky_uniform = SkyUniform::new(camera, &projection);
            self.queue
                .write_buffer(&self.sky_buffer, 0, bytemuck::cast_slice(&[sky_uniform]));
        }

        let mut draws = Vec::with_capacity(batches.len());
        for batch in batches {
            let Some(mesh) = meshes.get(batch.mesh_id) else {
                log::warn!("Skipping batch for unknown mesh {}", batch.mesh_id);
                continue;
            };
            if mesh.num_indices == 0 || batch.instances.is_empty() {
                continue;
            }
            let raw: Vec<_> = batch.instances.iter().map(Instance::to_raw).collect();
            let instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&raw),
                usage: wgpu::BufferUsages::VERTEX,
            });
            draws.push((mesh, instance_buffer, raw.len() as u32));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Offscreen Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Offscreen Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            if let Some(cube) = &self.sky_cube {
                render_pass.set_pipeline(&self.sky_pipeline);
                render_pass.set_bind_group(0, &self.sky_bind_group, &[]);
                render_pass.set_bind_group(1, cube, &[]);
                render_pass.draw(0..3, 0..1);
            }

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            for (mesh, instance_buffer, count) in &draws {
                render_pass.set_bind_group(1, mesh.material.as_ref().unwrap_or(&self.white), &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, 0..*count);
            }
        }
        log::debug!("Recorded {} instanced draws", draws.len());

        let bytes_per_row = padded_bytes_per_row(width);
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(iter::once(encoder.finish()));

        let pixels = read_buffer(&self.device, &output_buffer).await?;
        RgbaImage::from_raw(width, height, unpad_rows(&pixels, width, height))
            .context("Readback buffer is smaller than the image")
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let sampler = texture.sampler.as_ref().context("Texture has no sampler")?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("texture_bind_group"),
    }))
}

async fn read_buffer(device: &wgpu::Device, buffer: &wgpu::Buffer) -> anyhow::Result<Vec<u8>> {
    // The mapping has to be requested before polling, otherwise the future never resolves.
    let buffer_slice = buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("Failed waiting for the GPU")?;
    rx.receive()
        .await
        .context("Readback channel closed")?
        .context("Failed to map readback buffer")?;

    let data = buffer_slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}
