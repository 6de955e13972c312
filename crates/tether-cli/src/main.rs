//! Tether entry point.

use std::{
    fs::OpenOptions,
    io::{self, IsTerminal},
    sync::Mutex,
};

use clap::Parser;
use tether_app::App;
use tether_cli::{Args, Compositor, PipedInput, Runtime, TerminalInput};
use tether_client::{ConnectionSupervisor, websocket::WebSocketTransport};
use tether_core::SystemEnv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let supervisor_config = args.supervisor_config()?;
    let app_config = args.app_config();
    let endpoint = args.endpoint();

    let transport = WebSocketTransport::new(&endpoint.host, endpoint.port);
    let banner = format!(
        "tether {} connecting to {} (/help for commands)",
        app_config.version,
        transport.url()
    );
    tracing::info!(url = transport.url(), "tether starting");

    let supervisor = ConnectionSupervisor::new(supervisor_config, transport, app_config.handshake());
    let app = App::new(SystemEnv::new(), app_config);

    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
    let compositor = Compositor::new(io::stdout(), io::stdout().is_terminal());

    if interactive {
        let input = TerminalInput::new()?;
        Runtime::new(app, supervisor, compositor, input, banner).run().await?;
    } else {
        let input = PipedInput::stdin();
        Runtime::new(app, supervisor, compositor, input, banner).run().await?;
    }

    Ok(())
}

/// Logs never share the terminal with the compositor unless asked to:
/// `--log-file` wins, otherwise stderr only when `RUST_LOG` is set.
fn init_logging(args: &Args) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        },
        None => None,
    };
    let stderr_layer = (args.log_file.is_none() && std::env::var_os("RUST_LOG").is_some())
        .then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry().with(file_layer).with(stderr_layer).with(filter).init();
    Ok(())
}
