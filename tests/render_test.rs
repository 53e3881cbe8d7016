use cgmath::{assert_abs_diff_eq, Angle, InnerSpace, Matrix4, Vector3, Vector4};
use polysketch::{
    camera::{Camera, Projection},
    data_structures::instance::Instance,
    pipelines::skybox::SkyUniform,
    render::{batch_instances, padded_bytes_per_row, unpad_rows, DrawBatch, RenderConfig},
};

#[cfg(feature = "integration-tests")]
use futures::executor::block_on;
#[cfg(feature = "integration-tests")]
use crate::common::test_utils::headless_context;
#[cfg(feature = "integration-tests")]
use polysketch::{
    data_structures::{mesh::Mesh, skybox::Skybox},
    render::OffscreenRenderer,
};

mod common;

#[test]
fn should_group_instances_by_mesh_in_first_seen_order() {
    let at = |x: f32| Instance::from(Vector3::new(x, 0.0, 0.0));
    let batches = batch_instances(&[(2, at(0.0)), (0, at(1.0)), (2, at(2.0)), (2, at(3.0))]);
    assert_eq!(
        batches,
        vec![
            DrawBatch {
                mesh_id: 2,
                instances: vec![at(0.0), at(2.0), at(3.0)],
            },
            DrawBatch {
                mesh_id: 0,
                instances: vec![at(1.0)],
            },
        ]
    );
    assert!(batch_instances(&[]).is_empty());
}

#[test]
fn should_pad_rows_for_buffer_copies() {
    assert_eq!(padded_bytes_per_row(800), 3328);
    assert_eq!(padded_bytes_per_row(64), 256);
    assert_eq!(padded_bytes_per_row(1), 256);

    let mut data = vec![0u8; 512];
    data[..4].copy_from_slice(&[1, 2, 3, 4]);
    data[256..260].copy_from_slice(&[5, 6, 7, 8]);
    assert_eq!(unpad_rows(&data, 1, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn should_default_to_800_by_600() {
    let config = RenderConfig::default();
    assert_eq!((config.width, config.height), (800, 600));
    assert_eq!(config.clear.r, 0.2);
    assert_eq!(config.zfar, 500.0);
}

/// World direction through the centre of pixel `(x, y)`.
fn pixel_ray(camera: &Camera, config: &RenderConfig, x: u32, y: u32) -> Vector3<f32> {
    let ndc_x = (x as f32 + 0.5) / config.width as f32 * 2.0 - 1.0;
    let ndc_y = 1.0 - (y as f32 + 0.5) / config.height as f32 * 2.0;
    let forward = camera.forward();
    let right = forward.cross(camera.up).normalize();
    let up = right.cross(forward);
    let half = (config.fovy / 2.0).tan();
    let aspect = config.width as f32 / config.height as f32;
    (forward + right * (ndc_x * half * aspect) + up * (ndc_y * half)).normalize()
}

#[test]
fn should_map_clip_corners_to_view_rays() {
    let config = RenderConfig {
        width: 64,
        height: 48,
        ..Default::default()
    };
    let camera = Camera::new((4.0, 1.0, 3.0), (0.0, 0.5, 0.0));
    let projection = Projection::new(config.width, config.height, config.fovy, config.znear, config.zfar);
    let inv = Matrix4::from(SkyUniform::new(&camera, &projection).inv_view_proj);
    let ray = |ndc_x: f32, ndc_y: f32| {
        let far = inv * Vector4::new(ndc_x, ndc_y, 1.0, 1.0);
        (far.truncate() / far.w).normalize()
    };

    let centre = ray(0.0, 0.0);
    assert_abs_diff_eq!(centre, camera.forward(), epsilon = 1e-4);
    // top left pixel centre
    let corner = ray(1.0 / 64.0 - 1.0, 1.0 - 1.0 / 48.0);
    assert_abs_diff_eq!(corner, pixel_ray(&camera, &config, 0, 0), epsilon = 1e-4);
}

#[cfg(feature = "integration-tests")]
fn small_config() -> RenderConfig {
    RenderConfig {
        width: 64,
        height: 48,
        ..Default::default()
    }
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_read_back_clear_colour() {
    let ctx = headless_context();
    let renderer = OffscreenRenderer::new(&ctx, small_config()).unwrap();
    let camera = Camera::new((0.0, 0.0, 3.0), (0.0, 0.0, 0.0));
    let image = block_on(renderer.render(&camera, &[], &[])).unwrap();
    assert_eq!(image.dimensions(), (64, 48));
    assert!(image.pixels().all(|p| p.0 == [51, 76, 76, 255]));
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_draw_instanced_quad() {
    let ctx = headless_context();
    let renderer = OffscreenRenderer::new(&ctx, small_config()).unwrap();
    let quad = renderer.upload_mesh(&Mesh::quad(1.0, 1.0), None).unwrap();
    let empty = renderer.upload_mesh(&Mesh::new("empty"), None).unwrap();
    let camera = Camera::new((0.0, 0.0, 3.0), (0.0, 0.0, 0.0));
    let batches = batch_instances(&[(0, Instance::new()), (1, Instance::new()), (7, Instance::new())]);
    let image = block_on(renderer.render(&camera, &[quad, empty], &batches)).unwrap();

    assert_ne!(image.get_pixel(32, 24).0, [51, 76, 76, 255]);
    assert_eq!(image.get_pixel(0, 0).0, [51, 76, 76, 255]);
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_refuse_empty_target() {
    let ctx = headless_context();
    let config = RenderConfig {
        width: 0,
        ..Default::default()
    };
    assert!(OffscreenRenderer::new(&ctx, config).is_err());
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_upload_skybox_as_cube() {
    use cgmath::Vector4;
    use polysketch::data_structures::{skybox::Skybox, texture::Texture};

    let ctx = headless_context();
    let sky = Skybox::gradient(
        8,
        Vector4::new(0.8, 0.9, 1.0, 1.0),
        Vector4::new(0.2, 0.4, 0.9, 1.0),
        Vector4::new(0.3, 0.3, 0.3, 1.0),
    );
    let cube = Texture::cubemap_from_skybox(&ctx.device, &ctx.queue, &sky, "sky");
    assert_eq!(cube.texture.depth_or_array_layers(), 6);
    assert_eq!(cube.texture.width(), 8);
    assert!(cube.sampler.is_some());
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_load_texture_from_assets() {
    use crate::common::test_utils::{solid_image, TempAssets};
    use polysketch::resources::texture::load_texture;

    let assets = TempAssets::new("render-texture");
    assets.write_png("tile.png", &solid_image(4, 2, [10, 20, 30, 255]));

    let ctx = headless_context();
    let root = assets.root();
    let texture = block_on(load_texture(&root, "tile.png", false, &ctx.device, &ctx.queue, None)).unwrap();
    assert_eq!((texture.texture.width(), texture.texture.height()), (4, 2));
    assert!(block_on(load_texture(&root, "missing.png", false, &ctx.device, &ctx.queue, None)).is_err());
}

#[cfg(feature = "integration-tests")]
#[test]
fn should_draw_skybox_behind_empty_scene() {
    let ctx = headless_context();
    let config = small_config();
    let mut renderer = OffscreenRenderer::new(&ctx, config).unwrap();
    let sky = Skybox::gradient(
        16,
        Vector4::new(0.9, 0.8, 0.6, 1.0),
        Vector4::new(0.1, 0.3, 0.9, 1.0),
        Vector4::new(0.2, 0.2, 0.2, 1.0),
    );
    renderer.set_skybox(Some(&sky)).unwrap();
    assert!(renderer.has_skybox());

    let camera = Camera::new((0.0, 0.0, 3.0), (0.0, 0.0, 0.0));
    let image = block_on(renderer.render(&camera, &[], &[])).unwrap();
    for (x, y) in [(0, 0), (63, 47), (32, 24)] {
        let expected = sky.sample(pixel_ray(&camera, &config, x, y)).unwrap();
        let pixel = image.get_pixel(x, y).0;
        for c in 0..3 {
            let want = (expected[c] * 255.0).round();
            assert!(
                (pixel[c] as f32 - want).abs() <= 3.0,
                "pixel ({x}, {y}) channel {c}: {} vs {want}",
                pixel[c]
            );
        }
    }

    renderer.set_skybox(None).unwrap();
    let image = block_on(renderer.render(&camera, &[], &[])).unwrap();
    assert_eq!(image.get_pixel(0, 0).0, [51, 76, 76, 255]);
}
