//! Tutorial window backed by winit.
//!
//! A [`Scene`] is created once the window and GPU context exist, then asked
//! to record one [`Frame`] per redraw until the window closes.
//!
//! ```no_run
//! # use gpu_primer::{Frame, PrimerError, RenderContext, Options, Scene, Viewer};
//! struct Blank;
//!
//! impl Scene for Blank {
//!     fn init(_: &RenderContext, _: &Options) -> Result<Self, PrimerError> {
//!         Ok(Self)
//!     }
//!
//!     fn render(&mut self, _: &mut Frame<'_>, _: f32) -> Result<(), PrimerError> {
//!         Ok(())
//!     }
//! }
//!
//! Viewer::builder().with_title("blank").build().run::<Blank>().unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::error::PrimerError;
use crate::gpu::{Frame, RenderContext, RenderContextError};
use crate::options::Options;
use crate::util::FrameTiming;

/// What a tutorial draws.
pub trait Scene: Sized {
    /// Build GPU resources. Called once, after the context exists.
    ///
    /// # Errors
    ///
    /// Any error aborts the viewer and is returned from [`Viewer::run`].
    fn init(ctx: &RenderContext, options: &Options) -> Result<Self, PrimerError>;

    /// Record one frame. `elapsed` is seconds since the viewer started.
    ///
    /// # Errors
    ///
    /// Any error aborts the viewer and is returned from [`Viewer::run`].
    fn render(&mut self, frame: &mut Frame<'_>, elapsed: f32) -> Result<(), PrimerError>;

    /// The surface was resized.
    fn resized(&mut self, _ctx: &RenderContext, _width: u32, _height: u32) {}
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
#[derive(Debug)]
pub struct ViewerBuilder {
    options: Option<Options>,
    title: Option<String>,
}

impl ViewerBuilder {
    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title, replacing the one from the options.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        let mut options = self.options.unwrap_or_default();
        if let Some(title) = self.title {
            options.window.title = title;
        }
        Viewer { options }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A window that renders a [`Scene`] every frame.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
#[derive(Debug)]
pub struct Viewer {
    options: Options,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub const fn builder() -> ViewerBuilder {
        ViewerBuilder {
            options: None,
            title: None,
        }
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns the first window, GPU or scene error; the loop exits as soon
    /// as one happens.
    pub fn run<S: Scene>(self) -> Result<(), PrimerError> {
        let event_loop =
            EventLoop::new().map_err(|e| PrimerError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp::<S> {
            window: None,
            ctx: None,
            scene: None,
            timing: FrameTiming::new(self.options.render.fps_log_interval),
            options: self.options,
            error: None,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| PrimerError::Viewer(e.to_string()))?;
        app.error.map_or(Ok(()), Err)
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Internal winit application handler.
struct ViewerApp<S> {
    window: Option<Arc<Window>>,
    ctx: Option<RenderContext>,
    scene: Option<S>,
    timing: FrameTiming,
    options: Options,
    error: Option<PrimerError>,
}

impl<S: Scene> ViewerApp<S> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: PrimerError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, window: &Arc<Window>) -> Result<(), PrimerError> {
        let size = window.inner_size();
        let ctx = pollster::block_on(RenderContext::new(
            Arc::clone(window),
            (size.width, size.height),
            self.options.window.vsync,
        ))?;
        let scene = S::init(&ctx, &self.options)?;
        self.ctx = Some(ctx);
        self.scene = Some(scene);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), PrimerError> {
        let (Some(ctx), Some(scene)) = (&self.ctx, &mut self.scene) else {
            return Ok(());
        };
        let rendered = match ctx.begin_frame(self.options.render.clear()) {
            Ok(mut frame) => {
                let result = scene.render(&mut frame, self.timing.elapsed());
                frame.finish();
                self.timing.end_frame();
                Some(result)
            }
            Err(RenderContextError::Surface(
                wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost,
            )) => None,
            Err(e) => {
                log::warn!("skipping frame: {e}");
                Some(Ok(()))
            }
        };
        if let Some(result) = rendered {
            return result;
        }
        // Surface went stale: reconfigure and try again next redraw.
        if let (Some(ctx), Some(window)) = (&mut self.ctx, &self.window) {
            let size = window.inner_size();
            ctx.resize(size.width, size.height);
        }
        Ok(())
    }
}

impl<S: Scene> ApplicationHandler for ViewerApp<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let opts = &self.options.window;
        let attrs = Window::default_attributes()
            .with_title(&opts.title)
            .with_resizable(opts.resizable)
            .with_inner_size(winit::dpi::PhysicalSize::new(opts.width, opts.height));

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, PrimerError::Viewer(e.to_string()));
                return;
            }
        };

        if let Err(e) = self.init(&window) {
            self.fail(event_loop, e);
            return;
        }

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::Resized(size) => {
                if let Some(ctx) = &mut self.ctx {
                    ctx.resize(size.width, size.height);
                    if let Some(scene) = &mut self.scene {
                        scene.resized(ctx, size.width, size.height);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                    return;
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            _ => (),
        }
    }
}

/// Load `primer.toml` (or defaults), then run `S` in a window titled
/// `title`.
///
/// # Errors
///
/// Returns an options parse error or whatever [`Viewer::run`] returns.
pub fn run_tutorial<S: Scene>(title: &str) -> Result<(), PrimerError> {
    let options = Options::load_or_default(std::path::Path::new(
        crate::options::DEFAULT_OPTIONS_FILE,
    ))?;
    Viewer::builder()
        .with_options(options)
        .with_title(title)
        .build()
        .run::<S>()
}
