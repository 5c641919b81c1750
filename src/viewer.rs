//! Standalone visualization window backed by winit.
//!
//! When the `gui` feature is enabled, a wry webview scene panel is docked to
//! the right edge of the window and open/save go through native dialogs.
//!
//! ```no_run
//! # use std::path::PathBuf;
//! # use biovis::{Command, Viewer};
//! Viewer::builder()
//!     .with_command(Command::Open(PathBuf::from("1crn.pdb")))
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::error::BiovisError;
use crate::gpu::RenderContext;
use crate::input::{InputEvent, InputProcessor, KeyAction, MouseButton};
use crate::options::Options;
use crate::renderer::MeshRenderer;
use crate::session::{Command, Session};

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    commands: Vec<Command>,
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
            options: None,
            title: "BioVis".into(),
        }
    }

    /// Queue a command to run once the window is up (e.g. an initial
    /// [`Command::Open`] or [`Command::Fetch`]).
    #[must_use]
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            commands: self.commands,
            options: self.options.unwrap_or_default(),
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window with the scene, its camera controls, and (with the
/// `gui` feature) the scene panel.
pub struct Viewer {
    commands: Vec<Command>,
    options: Options,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// [`BiovisError::Viewer`] if the event loop cannot be created or exits
    /// abnormally, or the GUI toolkit fails to initialise.
    pub fn run(self) -> Result<(), BiovisError> {
        #[cfg(feature = "gui")]
        crate::gui::init_platform().map_err(BiovisError::Viewer)?;

        let event_loop = EventLoop::new().map_err(|e| BiovisError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            graphics: None,
            session: None,
            input: InputProcessor::new(self.options.keybindings.clone()),
            startup: self.commands,
            options: Some(self.options),
            title: self.title,
            #[cfg(feature = "gui")]
            panel: crate::gui::panel::PanelController::new(),
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| BiovisError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

struct Graphics {
    context: RenderContext,
    renderer: MeshRenderer,
}

impl Graphics {
    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        self.renderer.resize(&self.context);
    }

    fn render(&mut self, session: &Session) -> Result<(), wgpu::SurfaceError> {
        let viewport = session.viewport();
        self.renderer.sync(&self.context, viewport);

        let frame = self.context.get_next_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.context.create_encoder();
        self.renderer.render(
            &mut encoder,
            &view,
            viewport,
            session.options().display.background,
        );
        self.context.submit(encoder);
        frame.present();
        Ok(())
    }
}

struct ViewerApp {
    window: Option<Arc<Window>>,
    graphics: Option<Graphics>,
    session: Option<Session>,
    input: InputProcessor,
    startup: Vec<Command>,
    options: Option<Options>,
    title: String,
    #[cfg(feature = "gui")]
    panel: crate::gui::panel::PanelController,
}

/// Surface size for a window; never zero.
fn viewport_size(inner: winit::dpi::PhysicalSize<u32>) -> (u32, u32) {
    (inner.width.max(1), inner.height.max(1))
}

/// Translate a bound key into a session command. Open and export ask for a
/// path first.
fn command_for_key(action: KeyAction, session: &mut Session) -> Option<Command> {
    match action {
        KeyAction::OpenFile => open_command(),
        KeyAction::ExportSurface => export_command(session),
        KeyAction::GenerateSurface => Some(Command::GenerateSurface),
        KeyAction::DeleteSelected => Some(Command::DeleteSelected),
        KeyAction::RecenterCamera => Some(Command::ResetCamera),
        KeyAction::SelectNext => Some(Command::SelectNext),
        KeyAction::Cancel => Some(Command::Cancel),
    }
}

#[cfg(feature = "gui")]
fn open_command() -> Option<Command> {
    crate::gui::dialogs::open_command()
}

#[cfg(not(feature = "gui"))]
fn open_command() -> Option<Command> {
    log::warn!("file dialogs need the `gui` feature; drop a file onto the window instead");
    None
}

#[cfg(feature = "gui")]
fn export_command(session: &mut Session) -> Option<Command> {
    crate::gui::dialogs::export_command(session)
}

/// Without dialogs the surface is written to the working directory.
#[cfg(not(feature = "gui"))]
fn export_command(session: &mut Session) -> Option<Command> {
    session.ensure_exportable().ok()?;
    session
        .default_export_name()
        .map(|name| Command::ExportSurface(name.into()))
}

impl ViewerApp {
    fn run_command(&mut self, command: Command) {
        if let Some(session) = &mut self.session {
            let _ = session.execute(command);
        }
    }

    fn feed_input(&mut self, event: InputEvent) {
        let Some(action) = self.input.handle_event(event) else {
            return;
        };
        let Some(session) = &mut self.session else {
            return;
        };
        let selection = session.selected_handles();
        action.apply(session.viewport_mut(), &selection);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn show_notices(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };
        for notice in session.take_notices() {
            #[cfg(feature = "gui")]
            crate::gui::dialogs::show_notice(&notice);
            #[cfg(not(feature = "gui"))]
            log::warn!("{}: {}", notice.title, notice.message);
        }
    }

    fn redraw(&mut self) {
        #[cfg(feature = "gui")]
        {
            crate::gui::pump_events();
            if let Some(session) = &mut self.session {
                self.panel.drain_and_apply(session);
            }
        }

        if let Some(session) = &mut self.session {
            let _ = session.poll();
        }
        self.show_notices();

        #[cfg(feature = "gui")]
        if let Some(session) = &self.session {
            self.panel.push_state_if_changed(session);
        }

        if let (Some(graphics), Some(session)) = (&mut self.graphics, &self.session) {
            match graphics.render(session) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                    graphics.context.reconfigure();
                }
                Err(e) => log::error!("render error: {e:?}"),
            }
        }
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        let attrs = if let Some(mon) = &monitor {
            let mon_size = mon.size();
            let scale = mon.scale_factor();
            let logical_w = (f64::from(mon_size.width) / scale * 0.75) as u32;
            let logical_h = (f64::from(mon_size.height) / scale * 0.75) as u32;
            Window::default_attributes()
                .with_title(&self.title)
                .with_inner_size(winit::dpi::LogicalSize::new(logical_w, logical_h))
        } else {
            Window::default_attributes().with_title(&self.title)
        };

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let (vp_w, vp_h) = viewport_size(window.inner_size());
        let context =
            match pollster::block_on(RenderContext::new(Arc::clone(&window), (vp_w, vp_h))) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("Failed to initialize GPU: {e}");
                    event_loop.exit();
                    return;
                }
            };
        let renderer = MeshRenderer::new(&context);

        let options = self.options.take().unwrap_or_default();
        let mut session = match Session::new(options, vp_w, vp_h) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to start session: {e}");
                event_loop.exit();
                return;
            }
        };
        for command in self.startup.drain(..) {
            let _ = session.execute(command);
        }

        #[cfg(feature = "gui")]
        self.panel.init_webview(&window);

        window.request_redraw();
        self.window = Some(window);
        self.graphics = Some(Graphics { context, renderer });
        self.session = Some(session);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        if self.window.is_none() || self.session.is_none() {
            return;
        }

        match event {
            WindowEvent::Resized(event_size) => {
                let (vp_w, vp_h) = viewport_size(event_size);
                if let Some(graphics) = &mut self.graphics {
                    graphics.resize(vp_w, vp_h);
                }
                if let Some(session) = &mut self.session {
                    session.viewport_mut().resize(vp_w, vp_h);
                }
                #[cfg(feature = "gui")]
                if let Some(w) = &self.window {
                    self.panel.apply_layout(w);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            WindowEvent::MouseInput { button, state, .. } => {
                self.feed_input(InputEvent::MouseButton {
                    button: MouseButton::from(button),
                    pressed: state == ElementState::Pressed,
                });
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.feed_input(InputEvent::CursorMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }

            WindowEvent::CursorLeft { .. } => self.feed_input(InputEvent::CursorLeft),

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll_delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                self.feed_input(InputEvent::Scroll {
                    delta: scroll_delta,
                });
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.feed_input(InputEvent::ModifiersChanged(modifiers.state().into()));
            }

            WindowEvent::DroppedFile(path) => self.run_command(Command::Open(path)),

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(action) = self.input.handle_key_press(&format!("{code:?}")) else {
                    return;
                };
                let command = self
                    .session
                    .as_mut()
                    .and_then(|session| command_for_key(action, session));
                if let Some(command) = command {
                    self.run_command(command);
                }
            }

            _ => (),
        }
    }
}
