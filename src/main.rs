#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = desktop::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod desktop {
    use std::any::Any;
    use std::fmt;
    use std::panic::{self, AssertUnwindSafe};
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Context, Result};
    use clap::Parser;
    use log::info;
    use pollster::block_on;
    use winit::application::ApplicationHandler;
    use winit::dpi::{LogicalSize, PhysicalPosition};
    use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
    use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
    use winit::keyboard::{KeyCode, PhysicalKey};
    use winit::window::{Window, WindowId};

    use dragon_landing::app::{camera_params, describe_scene, light_params, print_final_state};
    use dragon_landing::assets::{self, AssetLoader, AssetState, FetchMode, FsSource};
    use dragon_landing::controls::OrbitControls;
    use dragon_landing::page::{
        FundingState, MountedPage, Page, TextRenderer, FUNDING_GOAL, INITIAL_RAISED,
    };
    use dragon_landing::render::Renderer;
    use dragon_landing::scene::SceneDescriptor;
    use dragon_landing::timer::VirtualClock;
    use dragon_landing::ROTATION_INTERVAL_MS;

    #[derive(Parser, Debug)]
    #[command(
        name = "dragon-landing",
        version,
        about = "X Gold Dragon X fundraising page with an interactive 3D scene"
    )]
    struct Cli {
        #[arg(
            long,
            env = "DRAGON_ASSETS",
            default_value = "public",
            help = "Directory served as the asset root"
        )]
        assets: PathBuf,
        #[arg(long, help = "Scene descriptor XML overriding the built-in scene")]
        scene: Option<PathBuf>,
        #[arg(long, help = "Print the page and scene without opening a window")]
        summary_only: bool,
        #[arg(long, default_value_t = 0, help = "Quote rotations to simulate in summary mode")]
        ticks: u32,
        #[arg(long, default_value_t = INITIAL_RAISED, help = "Funds raised so far")]
        raised: f64,
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        let descriptor = load_scene(cli.scene.as_deref())?;
        let funding = FundingState::new(cli.raised, FUNDING_GOAL);

        let mode = if cli.summary_only {
            FetchMode::Deferred
        } else {
            FetchMode::Background
        };
        let loader = assets::install_global(AssetLoader::new(FsSource::new(&cli.assets), mode));
        info!("serving assets from {}", cli.assets.display());

        if cli.summary_only {
            return run_headless(descriptor, funding, cli.ticks, loader);
        }

        match run_interactive(descriptor.clone(), funding, loader) {
            Ok(()) => Ok(()),
            Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
                eprintln!(
                    "{err}. Falling back to --summary-only mode \
                     (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(descriptor, funding, cli.ticks, loader)
            }
            Err(err) => Err(err),
        }
    }

    fn load_scene(path: Option<&Path>) -> Result<SceneDescriptor> {
        let Some(path) = path else {
            return Ok(SceneDescriptor::default());
        };
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        SceneDescriptor::from_xml(&xml)
            .with_context(|| format!("failed to parse scene XML {}", path.display()))
    }

    /// Pumps the loader until the model is no longer pending. Returns `None`
    /// right away for a scene without a model.
    fn wait_for_model(page: &MountedPage<'_>) -> Option<AssetState> {
        loop {
            page.pump();
            match page.asset_state() {
                Some(state) if state.is_pending() => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                state => return state,
            }
        }
    }

    fn run_headless(
        descriptor: SceneDescriptor,
        funding: FundingState,
        ticks: u32,
        loader: &'static AssetLoader,
    ) -> Result<()> {
        let clock = VirtualClock::new();
        let page = Page::new(descriptor)
            .with_funding(funding)
            .mount(clock.clone(), loader);

        println!("Scene before the model resolves:");
        for line in describe_scene(&page.scene()) {
            println!("{line}");
        }

        if let Some(AssetState::Failed(err)) = wait_for_model(&page) {
            println!("Model unavailable: {err}");
        }
        println!("Scene after the model resolves:");
        for line in describe_scene(&page.scene()) {
            println!("{line}");
        }
        println!();

        print!("{}", page.render(&mut TextRenderer::default()));
        println!();

        page.carousel().on_rotate(|index| println!("Rotated to quote {}", index + 1));
        let fired = clock.advance(u64::from(ticks) * u64::from(ROTATION_INTERVAL_MS));
        println!("Simulated {fired} rotation(s) over {} ms", clock.now());

        print_final_state(&page);
        page.unmount();
        Ok(())
    }

    fn run_interactive(
        descriptor: SceneDescriptor,
        funding: FundingState,
        loader: &'static AssetLoader,
    ) -> Result<()> {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
        panic::set_hook(default_hook);
        let event_loop = event_loop
            .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
            .map_err(|err| WindowInitError::from_error("event loop", err))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let clock = VirtualClock::new();
        let page = Page::new(descriptor)
            .with_funding(funding)
            .mount(clock.clone(), loader);
        let controls = page.page().composer().controls();
        let now = Instant::now();

        let mut app = DesktopApp {
            page,
            clock,
            controls,
            window: None,
            renderer: None,
            started: now,
            last_frame: now,
            shown_quote: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            dragging: false,
            last_error: None,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|err| anyhow!("event loop failed: {err}"))?;

        match app.last_error.take() {
            Some(err) => Err(err),
            None => {
                print_final_state(&app.page);
                Ok(())
            }
        }
    }

    struct DesktopApp {
        page: MountedPage<'static>,
        clock: Rc<VirtualClock>,
        controls: OrbitControls,
        window: Option<Arc<Window>>,
        renderer: Option<Renderer>,
        started: Instant,
        last_frame: Instant,
        shown_quote: Option<usize>,
        cursor: PhysicalPosition<f64>,
        dragging: bool,
        last_error: Option<anyhow::Error>,
    }

    impl DesktopApp {
        fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
            let attributes = Window::default_attributes()
                .with_title("X Gold Dragon X")
                .with_inner_size(LogicalSize::new(1280.0, 720.0));
            let window = Arc::new(
                event_loop
                    .create_window(attributes)
                    .map_err(|err| WindowInitError::from_error("window", err))?,
            );
            let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
            self.window = Some(window);
            self.renderer = Some(renderer);
            Ok(())
        }

        fn redraw(&mut self) -> Result<()> {
            let now = Instant::now();
            let dt = now.duration_since(self.last_frame);
            self.last_frame = now;

            self.clock
                .advance_to(now.duration_since(self.started).as_millis() as u64);
            self.page.pump();
            self.controls.update(dt.as_secs_f32());
            self.refresh_title();

            let Some(renderer) = self.renderer.as_mut() else {
                return Ok(());
            };
            let graph = self.page.scene();
            let camera = camera_params(&graph, &self.controls, renderer.aspect());
            let light = light_params(&graph, self.controls.target);
            let elapsed = now.duration_since(self.started).as_secs_f32();
            let twinkle = graph.stars().map_or(1.0, |stars| stars.twinkle(elapsed));
            renderer.update_globals(&camera, &light, twinkle);

            match renderer.render(&graph) {
                Ok(()) => Ok(()),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = renderer.window().inner_size();
                    renderer.resize(size);
                    Ok(())
                }
                Err(wgpu::SurfaceError::OutOfMemory) => Err(anyhow!("GPU is out of memory")),
                Err(err) => {
                    info!("surface error {err:?}; retrying next frame");
                    Ok(())
                }
            }
        }

        fn refresh_title(&mut self) {
            let index = self.page.carousel().index();
            if self.shown_quote == Some(index) {
                return;
            }
            self.shown_quote = Some(index);
            if let (Some(window), Some(quote)) = (&self.window, self.page.carousel().current()) {
                window.set_title(&format!(
                    "X Gold Dragon X - \"{}\" ({})",
                    quote.text, quote.author
                ));
            }
        }

        fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
            match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyP => {
                    if self.page.record_pledge(50.0) {
                        let progress = self.page.funding().progress();
                        println!(
                            "Raised {} of {} ({})",
                            progress.current_label, progress.goal_label, progress.bar_width
                        );
                    }
                }
                _ => {}
            }
        }
    }

    impl ApplicationHandler for DesktopApp {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            if let Err(err) = self.create_window(event_loop) {
                self.last_error = Some(err);
                event_loop.exit();
            }
        }

        fn window_event(
            &mut self,
            event_loop: &ActiveEventLoop,
            window_id: WindowId,
            event: WindowEvent,
        ) {
            let Some(renderer) = self.renderer.as_mut() else {
                return;
            };
            if window_id != renderer.window_id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested => event_loop.exit(),
                WindowEvent::Resized(size) => renderer.resize(size),
                WindowEvent::KeyboardInput { event, .. } => {
                    if let (ElementState::Pressed, PhysicalKey::Code(code), false) =
                        (event.state, event.physical_key, event.repeat)
                    {
                        self.handle_key(event_loop, code);
                    }
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    self.dragging = state == ElementState::Pressed;
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let delta_x = position.x - self.cursor.x;
                    let delta_y = position.y - self.cursor.y;
                    self.cursor = position;
                    if self.dragging {
                        self.controls.rotate(delta_x as f32, delta_y as f32);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                    };
                    self.controls.zoom(scroll);
                }
                WindowEvent::RedrawRequested => {
                    if let Err(err) = self.redraw() {
                        self.last_error = Some(err);
                        event_loop.exit();
                    }
                }
                _ => {}
            }
        }

        fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }

        fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
            if self.renderer.take().is_some() {
                info!("window closed");
            }
        }
    }

    #[derive(Debug)]
    struct WindowInitError {
        message: String,
    }

    impl WindowInitError {
        fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {}", panic_message(panic)),
            }
        }

        fn from_error(stage: &str, err: impl fmt::Display) -> Self {
            Self {
                message: format!("failed to initialize {stage}: {err}"),
            }
        }
    }

    impl fmt::Display for WindowInitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl std::error::Error for WindowInitError {}

    fn panic_message(panic: Box<dyn Any + Send>) -> String {
        match panic.downcast::<String>() {
            Ok(msg) => *msg,
            Err(panic) => match panic.downcast::<&'static str>() {
                Ok(msg) => (*msg).to_string(),
                Err(_) => "unknown panic".into(),
            },
        }
    }
}
