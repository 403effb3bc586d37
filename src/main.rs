use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use tapdeck::app::{Orchestrator, TapdeckApp};
use tapdeck::capture::TouchFrame;
use tapdeck::config::ConfigStore;
use tapdeck::cursor::ViewportSize;
use tapdeck::desktop::DesktopHost;
use tapdeck::dimensions::Dimensions;
use tapdeck::focus::ForegroundSnapshot;
use tapdeck::inject::recording::RecordingBackend;
use tapdeck::inject::InjectionBackend;
use tapdeck::layout::{content_size, KeyboardLayout};
use tapdeck::logging;
use tapdeck::motion::MouseMode;
use tapdeck::orchestrator::WindowOrchestrator;

#[derive(Parser)]
#[command(name = "tapdeck", about = "On-screen split keyboard and pointer overlay")]
struct Cli {
    /// Config file (default: ~/.tapdeck/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Layout name or JSON layout file
    #[arg(short, long)]
    layout: Option<String>,

    /// Pointer surface mode
    #[arg(short, long, value_enum)]
    mouse_mode: Option<MouseMode>,

    /// Drive a remote-session canvas of this size (WIDTHxHEIGHT) with an
    /// emulated cursor
    #[arg(long)]
    viewport: Option<ViewportSize>,

    /// Logical screen size used until the display reports its own
    #[arg(long, default_value = "1920x1080")]
    screen: ViewportSize,

    /// Read the touchscreen directly for the pointer surface
    #[arg(long)]
    raw_touch: bool,

    /// Log synthetic events instead of injecting them
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn injection_backend(dry_run: bool, screen: ViewportSize) -> Box<dyn InjectionBackend> {
    let (width, height) = (screen.width as i32, screen.height as i32);
    if dry_run {
        return Box::new(RecordingBackend::logging(width, height));
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(tapdeck::inject::windows_backend::SendInputBackend::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        #[cfg(target_os = "linux")]
        {
            match tapdeck::inject::uinput_backend::UinputBackend::open(width, height) {
                Ok(backend) => return Box::new(backend),
                Err(e) => tracing::error!("uinput unavailable, falling back to dry run: {e}"),
            }
        }
        Box::new(RecordingBackend::logging(width, height))
    }
}

fn desktop_host() -> Box<dyn DesktopHost> {
    #[cfg(target_os = "windows")]
    let host: Box<dyn DesktopHost> = Box::new(tapdeck::desktop::windows_host::WindowsDesktop::new());
    #[cfg(not(target_os = "windows"))]
    let host: Box<dyn DesktopHost> = Box::new(tapdeck::desktop::NullDesktop::new());
    host
}

fn raw_touch_source() -> Option<mpsc::Receiver<TouchFrame>> {
    #[cfg(target_os = "linux")]
    {
        use tapdeck::capture::evdev_backend::EvdevTouchSource;
        use tapdeck::discovery::udev_discovery::UdevDiscovery;
        use tapdeck::discovery::DeviceDiscovery;

        let devices = match UdevDiscovery::find_touchscreens() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("raw touch disabled: {e}");
                return None;
            }
        };
        let device = &devices[0];
        tracing::info!(devnode = %device.devnode.display(), name = ?device.name, "found touchscreen");
        match EvdevTouchSource::open(&device.devnode) {
            Ok(source) => Some(tapdeck::capture::spawn_capture_thread(source)),
            Err(e) => {
                tracing::warn!("raw touch disabled: {e}");
                None
            }
        }
    }
    #[cfg(target_os = "windows")]
    {
        match tapdeck::capture::windows_backend::RawTouchSource::open() {
            Ok(source) => Some(tapdeck::capture::spawn_capture_thread(source)),
            Err(e) => {
                tracing::warn!("raw touch disabled: {e}");
                None
            }
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        tracing::warn!("raw touch is not supported on this platform");
        None
    }
}

fn focus_poll() -> Option<mpsc::Receiver<ForegroundSnapshot>> {
    #[cfg(target_os = "windows")]
    {
        use tapdeck::focus::windows_probe::WindowsForegroundProbe;
        use tapdeck::focus::{spawn_focus_poll, FOCUS_POLL_INTERVAL};
        Some(spawn_focus_poll(WindowsForegroundProbe::new(), FOCUS_POLL_INTERVAL))
    }
    #[cfg(not(target_os = "windows"))]
    {
        None
    }
}

fn main() {
    let cli = Cli::parse();

    let config_path = match cli.config.clone().map_or_else(ConfigStore::default_path, Ok) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Unable to locate config: {}", e);
            std::process::exit(1);
        }
    };
    let loaded = ConfigStore::load(config_path.clone());
    let debug = cli.verbose || loaded.as_ref().is_ok_and(|s| s.config().debug_logging);
    logging::init(debug);
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!(path = %config_path.display(), error = %e, "failed to load config, using defaults");
        ConfigStore::with_defaults(config_path.clone())
    });

    if let Some(mode) = cli.mouse_mode {
        config.config_mut().mouse_mode = mode;
    }
    if let Some(viewport) = cli.viewport {
        config.config_mut().remote_viewport = Some(viewport);
    }
    let layout_name = cli
        .layout
        .clone()
        .unwrap_or_else(|| config.config().last_used_layout.clone());
    let layout = match KeyboardLayout::resolve(&layout_name) {
        Ok(layout) => {
            config.config_mut().last_used_layout = layout_name;
            layout
        }
        Err(e) => {
            tracing::warn!(layout = %layout_name, error = %e, "falling back to built-in layout");
            KeyboardLayout::split60()
        }
    };

    let mut dims = Dimensions::new(cli.screen.width as f32, cli.screen.height as f32);
    dims.left_content = content_size(&layout.left_keys);
    dims.right_content = content_size(&layout.right_keys);

    let backend = injection_backend(cli.dry_run, cli.screen);
    tracing::info!(backend = backend.name(), "injection ready");
    let orchestrator: Orchestrator =
        WindowOrchestrator::new(backend, desktop_host(), dims, config.config());

    let raw_rx = if cli.raw_touch { raw_touch_source() } else { None };
    let focus_rx = focus_poll();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([360.0, 220.0])
            .with_min_inner_size([300.0, 180.0])
            .with_title("tapdeck"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "tapdeck",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(TapdeckApp::new(
                orchestrator,
                config,
                layout,
                raw_rx,
                focus_rx,
            )))
        }),
    ) {
        tracing::error!("eframe failed: {e}");
        std::process::exit(1);
    }
}
