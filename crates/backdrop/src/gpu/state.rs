use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::compile::ProgramSource;
use crate::error::{MountError, SurfaceLost};
use crate::surface::{DrawingSurface, FrameOutcome, GraphicsBackend};
use crate::types::{Antialiasing, SurfaceId};
use crate::uniforms::{UniformBlock, UniformState};

use super::context::GpuContext;
use super::pipeline::CanvasPipeline;

/// [`GraphicsBackend`] that presents into a native window through wgpu.
pub struct WgpuBackend<T> {
    target: Arc<T>,
    antialiasing: Antialiasing,
    next_id: u64,
}

impl<T> WgpuBackend<T>
where
    T: HasDisplayHandle + HasWindowHandle + 'static,
{
    pub fn new(target: Arc<T>, antialiasing: Antialiasing) -> Self {
        Self {
            target,
            antialiasing,
            next_id: 0,
        }
    }
}

impl<T> GraphicsBackend for WgpuBackend<T>
where
    T: HasDisplayHandle + HasWindowHandle + 'static,
{
    fn create_surface(
        &mut self,
        size: PhysicalSize<u32>,
        program: &ProgramSource,
    ) -> Result<Box<dyn DrawingSurface>, MountError> {
        let context = GpuContext::new(self.target.as_ref(), size, self.antialiasing)
            .map_err(|err| MountError::unavailable(format!("{err:#}")))?;
        let pipeline = CanvasPipeline::new(
            &context.device,
            program,
            context.surface_format,
            context.sample_count,
        )?;

        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        let surface = WgpuSurface::new(id, context, pipeline, self.target.clone());
        debug!(
            surface = %id,
            format = ?surface.context.surface_format,
            sample_count = surface.context.sample_count,
            "created GPU drawing surface"
        );
        Ok(Box::new(surface))
    }

    fn create_solid_surface(
        &mut self,
        size: PhysicalSize<u32>,
        color: [f32; 3],
    ) -> Result<Box<dyn DrawingSurface>, MountError> {
        let context = GpuContext::new(self.target.as_ref(), size, Antialiasing::Off)
            .map_err(|err| MountError::unavailable(format!("{err:#}")))?;
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        debug!(surface = %id, ?color, "created solid GPU surface");
        Ok(Box::new(SolidSurface {
            id,
            color,
            context,
            _target: self.target.clone(),
        }))
    }
}

fn acquire_frame(
    context: &GpuContext,
    id: SurfaceId,
) -> Result<Option<wgpu::SurfaceTexture>, SurfaceLost> {
    match context.surface.get_current_texture() {
        Ok(frame) => Ok(Some(frame)),
        Err(wgpu::SurfaceError::Outdated) => {
            debug!(surface = %id, "swapchain outdated; reconfiguring");
            context.reconfigure();
            Ok(None)
        }
        Err(wgpu::SurfaceError::Timeout) => {
            warn!(surface = %id, "timed out acquiring frame; skipping");
            Ok(None)
        }
        Err(wgpu::SurfaceError::Lost) => Err(SurfaceLost::new("swapchain lost")),
        Err(wgpu::SurfaceError::OutOfMemory) => Err(SurfaceLost::new("out of GPU memory")),
        Err(err) => Err(SurfaceLost::new(err.to_string())),
    }
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

struct WgpuSurface<T> {
    id: SurfaceId,
    pipeline: CanvasPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    multisample_target: Option<MultisampleTarget>,
    context: GpuContext,
    // Declared last: the raw surface handle must not outlive the window.
    _target: Arc<T>,
}

impl<T> WgpuSurface<T> {
    fn new(id: SurfaceId, context: GpuContext, pipeline: CanvasPipeline, target: Arc<T>) -> Self {
        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("canvas uniform buffer"),
            size: std::mem::size_of::<UniformBlock>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("canvas uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        let mut surface = Self {
            id,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            multisample_target: None,
            context,
            _target: target,
        };
        surface.rebuild_multisample_target();
        surface
    }

    fn rebuild_multisample_target(&mut self) {
        self.multisample_target = if self.context.sample_count > 1 && self.context.has_area() {
            Some(MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            ))
        } else {
            None
        };
    }
}

impl<T> DrawingSurface for WgpuSurface<T> {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
        self.rebuild_multisample_target();
    }

    fn draw(&mut self, uniforms: &UniformState) -> Result<FrameOutcome, SurfaceLost> {
        if self.context.is_device_lost() {
            return Err(SurfaceLost::new("GPU device lost"));
        }
        if !self.context.has_area() {
            return Ok(FrameOutcome::Skipped);
        }
        let Some(frame) = acquire_frame(&self.context, self.id)? else {
            return Ok(FrameOutcome::Skipped);
        };

        let block = UniformBlock::from(uniforms);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&block));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("canvas encoder"),
            });
        {
            let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("canvas pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.draw(0..ProgramSource::QUAD_VERTICES, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();

        if self.context.is_device_lost() {
            return Err(SurfaceLost::new("GPU device lost"));
        }
        Ok(FrameOutcome::Presented)
    }
}

impl<T> Drop for WgpuSurface<T> {
    fn drop(&mut self) {
        debug!(surface = %self.id, "releasing GPU drawing surface");
    }
}

/// Swapchain cleared to one colour; shown once the animated canvas is gone.
struct SolidSurface<T> {
    id: SurfaceId,
    color: [f32; 3],
    context: GpuContext,
    _target: Arc<T>,
}

impl<T> DrawingSurface for SolidSurface<T> {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.context.resize(size);
    }

    fn draw(&mut self, _uniforms: &UniformState) -> Result<FrameOutcome, SurfaceLost> {
        if self.context.is_device_lost() {
            return Err(SurfaceLost::new("GPU device lost"));
        }
        if !self.context.has_area() {
            return Ok(FrameOutcome::Skipped);
        }
        let Some(frame) = acquire_frame(&self.context, self.id)? else {
            return Ok(FrameOutcome::Skipped);
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let [r, g, b] = self.color;
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("solid encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("solid clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(r),
                        g: f64::from(g),
                        b: f64::from(b),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(FrameOutcome::Presented)
    }
}
