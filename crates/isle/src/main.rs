use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use wayland_protocols::xdg::shell::server::xdg_wm_base::XdgWmBase;
use wayland_server::protocol::{
    wl_compositor::WlCompositor, wl_output::WlOutput, wl_seat::WlSeat, wl_shm::WlShm,
};
use wayland_server::{Display, ListeningSocket};

use isle::config::Config;
use isle::shell::OutputId;
use isle::state::{State, DEFAULT_SEAT};
use isle_common::{parse_level, FileLogger};

#[derive(Parser, Debug)]
#[command(name = "isle", version, about = "Headless Wayland shell compositor")]
struct Args {
    /// Configuration file to use instead of the default search path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Socket name under XDG_RUNTIME_DIR
    #[arg(short, long)]
    socket: Option<String>,

    /// Overrides the configured log level
    #[arg(short, long)]
    log_level: Option<String>,
}

struct LoopData {
    display: Display<State>,
    state: State,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("isle: {}", e);
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    let level = match args.log_level.as_deref() {
        Some(s) => parse_level(s).ok_or_else(|| format!("invalid log level '{}'", s))?,
        None => config.log_level(),
    };
    FileLogger::init(level)?;

    let mut display = Display::<State>::new()?;
    let dh = display.handle();

    dh.create_global::<State, WlCompositor, _>(6, ());
    dh.create_global::<State, WlShm, _>(1, ());
    dh.create_global::<State, WlSeat, _>(7, DEFAULT_SEAT);
    for (i, output) in config.outputs.iter().enumerate() {
        let id = i as OutputId + 1;
        dh.create_global::<State, WlOutput, _>(4, id);
        log::info!(
            "Output {} '{}' at {}x{}+{}+{}",
            id,
            output.name,
            output.width,
            output.height,
            output.x,
            output.y
        );
    }
    dh.create_global::<State, XdgWmBase, _>(config.xdg_wm_base_version(), ());

    let socket = match &args.socket {
        Some(name) => ListeningSocket::bind(name)?,
        None => ListeningSocket::bind_auto("wayland", 0..32)?,
    };
    let socket_name = socket
        .socket_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!("Listening on: {}", socket_name);

    let mut event_loop = calloop::EventLoop::<LoopData>::try_new()?;
    let handle = event_loop.handle();

    handle.insert_source(
        calloop::generic::Generic::new(socket, calloop::Interest::READ, calloop::Mode::Level),
        |_, socket, data| {
            if let Some(stream) = socket.accept()? {
                match data.display.handle().insert_client(stream, Arc::new(())) {
                    Ok(client_id) => log::info!("Client connected: {:?}", client_id),
                    Err(e) => log::error!("Failed to insert client: {}", e),
                }
            }
            Ok(calloop::PostAction::Continue)
        },
    )
    .map_err(|e| e.error)?;

    let poll_fd = display.backend().poll_fd().try_clone_to_owned()?;
    handle.insert_source(
        calloop::generic::Generic::new(poll_fd, calloop::Interest::READ, calloop::Mode::Level),
        |_, _, data| {
            if let Err(e) = data.display.dispatch_clients(&mut data.state) {
                log::error!("Failed to dispatch clients: {}", e);
            }
            data.display.flush_clients().ok();
            Ok(calloop::PostAction::Continue)
        },
    )
    .map_err(|e| e.error)?;

    handle.insert_source(
        calloop::timer::Timer::from_duration(Duration::from_millis(16)),
        |_deadline, _: &mut (), data| {
            data.state.tick();
            data.display.flush_clients().ok();
            calloop::timer::TimeoutAction::ToDuration(Duration::from_millis(16))
        },
    )
    .map_err(|e| e.error)?;

    let mut loop_data = LoopData {
        display,
        state: State::new(config),
    };

    log::info!("Isle running on {}", socket_name);
    loop {
        event_loop.dispatch(None, &mut loop_data)?;
    }
}
