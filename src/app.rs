//! Application event loop: setup, per-frame update/render and shutdown.
//!
//! Everything that mutates the scene lives here, on the render thread. The
//! per-frame order is:
//! 1. Integrate the movement state into the camera eye
//! 2. Upload the camera uniform
//! 3. Reassign every instance transform for the current animation angle
//! 4. Submit a refresh request and apply at most one streamed texture payload
//! 5. Record one render pass drawing the scene in insertion order
//!
//! The streaming worker is stopped and joined before the GPU context is
//! dropped, so no payload can target a dead instance list.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Rad};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    context::Context,
    data_structures::{
        instance::{DrawScene, SceneInstance},
        mesh::MeshAsset,
        scene::{Scene, grid_translations},
        texture::Texture,
    },
    resources,
    streaming::{
        FileTextureDecoder, PayloadOutcome, REFRESH_INTERVAL_FRAMES, REFRESH_RADIUS,
        RefreshRequest, StreamingCoordinator,
    },
};

/// Scene content and window parameters, fixed at startup.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mesh_file: String,
    /// Texture every instance starts with.
    pub texture_file: String,
    /// Texture the streaming worker decodes for nearby instances.
    pub stream_texture_file: String,
    pub grid_cols: usize,
    pub grid_rows: usize,
    pub grid_spacing: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            title: "boxstream".to_string(),
            width: 1024,
            height: 768,
            mesh_file: "box.obj".to_string(),
            texture_file: "darmstadtmini.png".to_string(),
            stream_texture_file: "darmstadt.png".to_string(),
            grid_cols: 10,
            grid_rows: 10,
            grid_spacing: 10.0,
        }
    }
}

/// Everything owned by the render thread once setup succeeded.
struct AppState {
    ctx: Context,
    scene: Scene<SceneInstance>,
    streaming: StreamingCoordinator,
    config: SceneConfig,
    is_surface_configured: bool,
    start_time: Instant,
    frame: u64,
    last_refreshed: Option<usize>,
}

impl AppState {
    fn new(window: Arc<Window>, config: SceneConfig) -> anyhow::Result<Self> {
        let ctx = pollster::block_on(Context::new(
            window,
            config.width,
            config.height,
        ))?;

        let mesh = Arc::new(
            MeshAsset::load(&ctx.device, &config.mesh_file)
                .with_context(|| format!("loading mesh {}", config.mesh_file))?,
        );
        // One decode, one GPU upload per instance: every box pretends to have
        // its own texture so the streaming swap is per-instance.
        let pixels = resources::texture::decode_image(&config.texture_file)
            .with_context(|| format!("loading texture {}", config.texture_file))?;

        let mut scene = Scene::with_capacity(config.grid_cols * config.grid_rows);
        for translation in grid_translations(config.grid_cols, config.grid_rows, config.grid_spacing)
        {
            let texture = Texture::from_pixels(&ctx.device, &ctx.queue, &pixels, &config.texture_file);
            let instance = SceneInstance::bind(
                &ctx.device,
                &ctx.texture_layout,
                &ctx.model_layout,
                Arc::clone(&mesh),
                texture,
                translation,
            );
            scene.push(instance)?;
        }
        log::info!(
            "scene ready: {} instances of {}",
            scene.len(),
            config.mesh_file
        );

        let streaming = StreamingCoordinator::spawn(FileTextureDecoder);

        Ok(Self {
            ctx,
            scene,
            streaming,
            config,
            is_surface_configured: false,
            start_time: Instant::now(),
            frame: 0,
            last_refreshed: None,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn update(&mut self) {
        self.frame += 1;

        // Movement: a fixed step per pressed direction, once per frame.
        let movement = self.ctx.camera.movement;
        movement.integrate(&mut self.ctx.camera.camera.eye);
        self.ctx
            .camera
            .uniform
            .update_view_proj(&self.ctx.camera.camera, &self.ctx.projection);
        self.ctx.queue.write_buffer(
            &self.ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.ctx.camera.uniform]),
        );

        // Spin every box in place around its own base position.
        let angle = Rad(self.start_time.elapsed().as_secs_f32());
        let queue = &self.ctx.queue;
        self.scene.for_each_mut(|_, instance| {
            let transform =
                Matrix4::from_translation(instance.translation) * Matrix4::from_angle_y(angle);
            instance.set_transform(queue, transform);
        });

        self.submit_refresh_request();
        self.apply_stream_payload();
    }

    /// Refresh policy: every `REFRESH_INTERVAL_FRAMES` frames, ask for new
    /// pixels for the live instance nearest the eye within `REFRESH_RADIUS`.
    /// Target selection lives in [`pick_refresh_target`].
    fn submit_refresh_request(&mut self) {
        if self.frame % REFRESH_INTERVAL_FRAMES != 0 {
            return;
        }
        let eye = self.ctx.camera.camera.eye.to_vec();
        let mut distances = Vec::with_capacity(self.scene.len());
        self.scene.for_each(|index, instance| {
            distances.push((index, (instance.translation - eye).magnitude()));
        });
        if let Some(index) = pick_refresh_target(distances.into_iter(), self.last_refreshed) {
            self.streaming.request(RefreshRequest {
                instance: index,
                path: self.config.stream_texture_file.clone(),
            });
            self.last_refreshed = Some(index);
        }
    }

    /// Apply at most one finished payload per frame. GPU texture creation
    /// happens here, on the render thread, never in the worker.
    fn apply_stream_payload(&mut self) {
        match self.streaming.poll() {
            Some(PayloadOutcome::Ready(payload)) => {
                if let Some(instance) = self.scene.get_mut(payload.instance) {
                    let texture = Texture::from_pixels(
                        &self.ctx.device,
                        &self.ctx.queue,
                        &payload.pixels,
                        "streamed texture",
                    );
                    instance.set_texture(&self.ctx.device, &self.ctx.texture_layout, texture);
                    log::debug!("swapped texture on instance {}", payload.instance);
                } else {
                    log::warn!(
                        "streamed payload targets unknown instance {}",
                        payload.instance
                    );
                }
            }
            // The instance keeps its current texture; the worker already
            // moved on to the next request.
            Some(PayloadOutcome::Failed(err)) => log::warn!("skipping payload: {err}"),
            None => (),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.ctx.scene_pipeline);
            let camera_bind_group = &self.ctx.camera.bind_group;
            self.scene.for_each(|_, instance| {
                render_pass.draw_instance(instance, camera_bind_group);
            });
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

/// Pick the next instance to refresh from `(index, distance)` pairs.
///
/// The nearest instance within [`REFRESH_RADIUS`] wins, skipping the one
/// refreshed last so the rotation moves on. When that skip leaves no
/// candidate but the last refreshed instance is itself still in range, it
/// is picked again: a lone nearby instance keeps receiving refreshes.
fn pick_refresh_target(
    distances: impl Iterator<Item = (usize, f32)>,
    last: Option<usize>,
) -> Option<usize> {
    let mut nearest: Option<(usize, f32)> = None;
    let mut last_in_range = false;
    for (index, distance) in distances {
        if distance > REFRESH_RADIUS {
            continue;
        }
        if last == Some(index) {
            last_in_range = true;
            continue;
        }
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((index, distance));
        }
    }
    nearest
        .map(|(index, _)| index)
        .or(if last_in_range { last } else { None })
}

/// The winit application. State is built on `resumed` and torn down in
/// order: streaming worker first, GPU context last.
pub struct App {
    config: SceneConfig,
    state: Option<AppState>,
}

impl App {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => panic!("failed to create window: {e}"),
        };

        // Setup-time failures are unrecoverable: no partial scene is rendered.
        let mut state = match AppState::new(window, self.config.clone()) {
            Ok(state) => state,
            Err(e) => panic!("scene setup failed: {e:#}"),
        };
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        state.ctx.window.request_redraw();
        self.state = Some(state);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                state.streaming.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                state
                    .ctx
                    .camera
                    .movement
                    .handle_key(code, key_state.is_pressed());
            }
            // Pointer events are part of the external boundary but unused.
            WindowEvent::CursorMoved { .. } | WindowEvent::MouseInput { .. } => (),
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("unable to render: {e}"),
                }
            }
            _ => (),
        }
    }
}

/// Build the grid scene described by `config` and run it until the window
/// closes.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_picks_nearest_in_range_and_rotates_away_from_last() {
        let distances = [(0, 5.0), (1, 2.0), (2, 70.0)];
        assert_eq!(pick_refresh_target(distances.into_iter(), None), Some(1));
        // Instance 1 was just refreshed, so the next nearest wins.
        assert_eq!(pick_refresh_target(distances.into_iter(), Some(1)), Some(0));
    }

    #[test]
    fn lone_nearby_instance_keeps_receiving_refreshes() {
        let distances = [(4, 10.0), (5, 90.0)];
        assert_eq!(pick_refresh_target(distances.into_iter(), Some(4)), Some(4));
    }

    #[test]
    fn nothing_in_range_yields_no_target() {
        let distances = [(0, 61.0), (1, 100.0)];
        assert_eq!(pick_refresh_target(distances.into_iter(), Some(0)), None);
        assert_eq!(pick_refresh_target(std::iter::empty(), None), None);
    }
}
