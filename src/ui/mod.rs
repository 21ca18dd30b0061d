use egui_wgpu::Renderer;
use egui_winit::State;
use wgpu::{CommandBuffer, CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{event::WindowEvent, window::Window};

use crate::app::ControlsView;
use crate::graphics::Canvas;

/// Something the user asked for through the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    Open,
    Play,
    Pause,
}

pub struct UserInterface {
    context: egui::Context,
    state: State,
    renderer: Renderer,
    canvas_texture: Option<egui::TextureHandle>,
    show_controls: bool,
}

impl UserInterface {
    pub fn new(window: &Window, device: &Device, format: TextureFormat) -> Self {
        let context = egui::Context::default();

        let egui_state = State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );

        let renderer = Renderer::new(device, format, None, 1);

        Self {
            context,
            state: egui_state,
            renderer,
            canvas_texture: None,
            show_controls: true,
        }
    }

    /// Feeds a window event to egui. Returns true when the UI wants a repaint.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).repaint
    }

    /// True while a text field or similar has keyboard focus.
    pub fn wants_keyboard(&self) -> bool {
        self.context.wants_keyboard_input()
    }

    /// Copies the latest canvas pixels into the texture drawn behind the
    /// controls.
    pub fn upload_canvas(&mut self, canvas: &Canvas) {
        let image = egui::ColorImage::from_rgba_premultiplied(
            [canvas.width() as usize, canvas.height() as usize],
            canvas.pixels(),
        );

        match &mut self.canvas_texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.canvas_texture = Some(self.context.load_texture(
                    "scope-canvas",
                    image,
                    egui::TextureOptions::LINEAR,
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        encoder: &mut CommandEncoder,
        target: &TextureView,
        device: &Device,
        queue: &Queue,
        window: &Window,
        size_in_pixels: [u32; 2],
        controls: &ControlsView,
    ) -> (Vec<UiCommand>, Vec<CommandBuffer>) {
        let raw_input = self.state.take_egui_input(window);

        let show_controls = &mut self.show_controls;
        let canvas_texture = self.canvas_texture.as_ref().map(|t| t.id());
        let mut commands = Vec::new();

        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui_content(ctx, show_controls, canvas_texture, controls, &mut commands);
        });

        self.state.handle_platform_output(window, full_output.platform_output);

        let tris = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: full_output.pixels_per_point,
        };

        let buffers = self
            .renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        (commands, buffers)
    }

    fn ui_content(
        ctx: &egui::Context,
        show_controls: &mut bool,
        canvas_texture: Option<egui::TextureId>,
        controls: &ControlsView,
        commands: &mut Vec<UiCommand>,
    ) {
        // The scope fills the window underneath everything else
        if let Some(texture) = canvas_texture {
            let painter = ctx.layer_painter(egui::LayerId::background());
            painter.image(
                texture,
                ctx.screen_rect(),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        if *show_controls {
            egui::Window::new("Ringscope")
                .default_pos([10.0, 10.0])
                .resizable(false)
                .show(ctx, |ui| {
                    match (&controls.loading, &controls.file_name) {
                        (Some(loading), _) => ui.label(format!("Loading {}…", loading)),
                        (None, Some(name)) => ui.label(name.as_str()),
                        (None, None) => ui.label("No file loaded"),
                    };

                    ui.horizontal(|ui| {
                        if ui.button("Open…").clicked() {
                            commands.push(UiCommand::Open);
                        }
                        // Play while playing restarts from the stored position
                        if ui.button("Play").clicked() {
                            commands.push(UiCommand::Play);
                        }
                        if ui.button("Pause").clicked() {
                            commands.push(UiCommand::Pause);
                        }
                        if controls.playing {
                            ui.label("▶");
                        }
                    });

                    if let Some(status) = &controls.status {
                        ui.separator();
                        ui.colored_label(egui::Color32::LIGHT_RED, status);
                    }

                    ui.separator();
                    ui.small("Space play/pause · O open · F1 hide · Esc quit");
                });
        }

        if ctx.input(|i| i.key_pressed(egui::Key::F1)) {
            *show_controls = !*show_controls;
        }
    }
}
