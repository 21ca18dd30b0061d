use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::EventLoopBuilder,
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use ringscope::audio::{Analyser, AudioLoader, AudioPlayback, LoadOutcome, TokioLoader, DEFAULT_WINDOW_SIZE};
use ringscope::effects::{PresetManager, ScopePreset};
use ringscope::graphics::{Canvas, DrawFailurePolicy, GraphicsEngine, RenderLoop, TickOutcome, WallClock};
use ringscope::player::{Player, Transport};
use ringscope::ui::{UiCommand, UserInterface};
use ringscope::Visualizer;

enum AppEvent {
    Loaded(LoadOutcome),
}

#[derive(Parser)]
#[command(name = "ringscope")]
#[command(about = "Loop a local audio file and watch its waveform as a ring")]
struct Args {
    /// Audio file to open on startup (.wav or .mp3)
    #[arg()]
    file: Option<PathBuf>,

    /// Built-in preset: ring, ring-outline or line
    #[arg(long, default_value = "ring")]
    preset: String,

    /// JSON preset file, overrides --preset
    #[arg(long)]
    preset_file: Option<PathBuf>,

    /// Samples per analysis window (power of two, 32 to 32768)
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE, value_parser = parse_window_size)]
    window_size: usize,

    /// What a failed frame does to the animation
    #[arg(long, value_enum, default_value_t = DrawFailurePolicy::LogAndContinue)]
    on_draw_error: DrawFailurePolicy,

    /// Initial window width
    #[arg(long, default_value = "1200")]
    width: u32,

    /// Initial window height
    #[arg(long, default_value = "800")]
    height: u32,

    /// Print the built-in presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn parse_window_size(value: &str) -> std::result::Result<usize, String> {
    let size: usize = value.parse().map_err(|e| format!("{}", e))?;
    if size.is_power_of_two() && (32..=32768).contains(&size) {
        Ok(size)
    } else {
        Err(format!("{} is not a power of two between 32 and 32768", size))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let presets = PresetManager::new();
    if args.list_presets {
        for preset in presets.get_presets() {
            println!("{:<14} {:?}", preset.name, preset.mode);
        }
        return Ok(());
    }

    let preset = match &args.preset_file {
        Some(path) => ScopePreset::load(path)?,
        None => presets.get(&args.preset)?.clone(),
    };
    info!("Starting Ringscope (preset '{}', window {} samples)", preset.name, args.window_size);

    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Ringscope")
            .with_inner_size(winit::dpi::LogicalSize::new(args.width, args.height))
            .build(&event_loop)?,
    );

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(Arc::clone(&window)))?;
    let mut ui = UserInterface::new(&window, &graphics_engine.device, graphics_engine.config.format);

    let analyser = Analyser::new(args.window_size);
    let playback = AudioPlayback::new(analyser.tap())?;

    let proxy = Mutex::new(event_loop.create_proxy());
    let loader = TokioLoader::new(move |outcome| {
        if let Ok(proxy) = proxy.lock() {
            if proxy.send_event(AppEvent::Loaded(outcome)).is_err() {
                warn!("Event loop closed before the file finished loading");
            }
        }
    })?;

    let size = window.inner_size();
    let canvas = Canvas::new(size.width.max(1), size.height.max(1))?;
    let mut visualizer = Visualizer::new(
        Player::new(playback),
        loader,
        analyser,
        RenderLoop::new(args.on_draw_error),
        canvas,
        preset,
    );

    if let Some(path) = args.file {
        if let Err(e) = visualizer.open(path) {
            visualizer.report(e);
        }
    }
    ui.upload_canvas(visualizer.canvas());

    info!("Visualizer initialized successfully");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| match event {
        Event::UserEvent(AppEvent::Loaded(outcome)) => {
            if let Err(e) = visualizer.on_loaded(outcome) {
                visualizer.report(e);
            }
            window_clone.request_redraw();
        }
        Event::WindowEvent { event, .. } => {
            let repaint = ui.handle_event(&window_clone, &event);

            match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested");
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed && !event.repeat && !ui.wants_keyboard() =>
                {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!("Escape pressed");
                            elwt.exit();
                        }
                        PhysicalKey::Code(KeyCode::Space) => {
                            if let Err(e) = visualizer.toggle() {
                                visualizer.report(e);
                            }
                            window_clone.request_redraw();
                        }
                        PhysicalKey::Code(KeyCode::KeyO) => {
                            run_command(&mut visualizer, UiCommand::Open);
                            window_clone.request_redraw();
                        }
                        _ => {}
                    }
                }
                WindowEvent::Resized(physical_size) => {
                    graphics_engine.resize(physical_size);
                    if let Err(e) = visualizer.resize(physical_size.width, physical_size.height) {
                        visualizer.report(e);
                    }
                    ui.upload_canvas(visualizer.canvas());
                    window_clone.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    if visualizer.frame(window_clone.as_ref(), WallClock::now()) != TickOutcome::Idle {
                        ui.upload_canvas(visualizer.canvas());
                    }

                    let controls = visualizer.controls_view();
                    match graphics_engine.render(&mut ui, &window_clone, &controls) {
                        Ok(commands) => {
                            for command in commands {
                                run_command(&mut visualizer, command);
                                window_clone.request_redraw();
                            }
                        }
                        Err(e) => error!("Render error: {}", e),
                    }
                }
                _ => {}
            }

            if repaint {
                window_clone.request_redraw();
            }
        }
        _ => {}
    })?;

    Ok(())
}

fn run_command<T: Transport, L: AudioLoader>(visualizer: &mut Visualizer<T, L>, command: UiCommand) {
    let result = match command {
        UiCommand::Open => match rfd::FileDialog::new().set_title("Open audio file").pick_file() {
            Some(path) => visualizer.open(path),
            None => Ok(()),
        },
        UiCommand::Play => visualizer.play(),
        UiCommand::Pause => visualizer.pause(),
    };

    if let Err(e) = result {
        visualizer.report(e);
    }
}
