//! Headless GPU context.
//!
//! Owns the wgpu device and queue. No surface is created: everything is drawn
//! into offscreen textures and read back, see [`crate::render`].

use anyhow::Context;

#[derive(Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request an adapter without a compatible surface and open a device on it.
    ///
    /// Respects `WGPU_BACKEND` and related environment variables, so tests can
    /// be pointed at a software adapter.
    pub async fn new_headless() -> anyhow::Result<Self> {
        Self::with_power_preference(wgpu::PowerPreference::default(), false).await
    }

    pub async fn with_power_preference(
        power_preference: wgpu::PowerPreference,
        force_fallback_adapter: bool,
    ) -> anyhow::Result<Self> {
        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle_from_env());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .context("No suitable GPU adapter found")?;
        let adapter_info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("polysketch device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .context("Failed to open GPU device")?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}
