use std::path::Path;
use std::process::ExitCode;

use colored::Colorize;
use crossbeam_channel::{bounded, select, unbounded};
use gameport_session::{
    list_ports, ConnectionSession, LogEvent, SerialConnector, SessionEvent, SinkProvider,
};

use crate::api::{merge_policy, ApiTransport, Command, UnixSocket};
use crate::cli::RunArgs;
use crate::sink::DryRunProvider;
use crate::{print_debug, print_error, print_info, print_warning};

#[cfg(target_os = "linux")]
fn system_provider() -> Option<Box<dyn SinkProvider>> {
    Some(Box::new(gameport_session::UinputProvider))
}

#[cfg(not(target_os = "linux"))]
fn system_provider() -> Option<Box<dyn SinkProvider>> {
    None
}

fn resolve_port(port: Option<&str>) -> Option<String> {
    if let Some(port) = port {
        return Some(port.to_owned());
    }
    match list_ports() {
        Ok(ports) => ports.into_iter().next().map(|p| p.name),
        Err(e) => {
            print_error!("{e}");
            None
        }
    }
}

/// Run the bridge in the foreground until Ctrl+C.
pub(crate) fn run(args: &RunArgs, runtime_dir: &Path) -> ExitCode {
    let Some(port) = resolve_port(args.port.as_deref()) else {
        print_error!("no serial port found, pass one with --port");
        return ExitCode::FAILURE;
    };
    let provider: Box<dyn SinkProvider> = if args.dry_run {
        Box::new(DryRunProvider)
    } else if let Some(provider) = system_provider() {
        provider
    } else {
        print_error!("virtual joystick is not supported on this platform, use --dry-run");
        return ExitCode::FAILURE;
    };

    let session = ConnectionSession::new(SerialConnector, provider, args.session_config());
    session.update_policy(args.policy());
    let events = session.subscribe();

    // Handle Ctrl+C to exit cleanly
    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .expect("failed to set Ctrl+C handler");

    let api = UnixSocket::new(runtime_dir);
    // Keeping a sender here means `api_rx` never disconnects, even when
    // the listener could not be started.
    let (api_tx, api_rx) = unbounded::<Command>();
    if let Err(e) = api.listen_events(api_tx.clone()) {
        print_warning!("control socket unavailable: {e}");
    }

    if let Err(e) = session.start(&port) {
        print_error!("failed to start session: {e}");
        api.remove();
        return ExitCode::FAILURE;
    }
    print_info!("gameportd started. Bridging {port} to virtual joystick {}.", args.device_id);

    loop {
        select! {
            recv(stop_rx) -> _ => {
                break;
            }
            recv(events) -> msg => {
                match msg {
                    Ok(event) => report(&event),
                    Err(_) => break,
                }
            }
            recv(api_rx) -> msg => {
                if let Ok(command) = msg {
                    handle_command(&session, &port, command);
                }
            }
        }
    }

    drop(api_tx);
    session.stop();
    for event in events.try_iter() {
        report(&event);
    }
    api.remove();
    ExitCode::SUCCESS
}

fn handle_command(session: &ConnectionSession, port: &str, command: Command) {
    match command {
        Command::Policy { swap, axis1, axis2 } => {
            let policy = merge_policy(session.policy(), swap, axis1, axis2);
            session.update_policy(policy);
            print_info!(
                "policy updated: swap={} axis1={} axis2={}",
                policy.swap,
                policy.axis1_enabled,
                policy.axis2_enabled
            );
        }
        Command::Connect => {
            if session.is_running() {
                print_info!("already connected to {port}");
            } else if let Err(e) = session.start(port) {
                print_error!("failed to start session: {e}");
            }
        }
        Command::Disconnect => session.stop(),
    }
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged(state) => {
            print_debug!("session state: {state}");
        }
        SessionEvent::Log(entry) => report_log(entry),
    }
}

fn report_log(entry: &LogEvent) {
    match entry.level() {
        log::Level::Error => {
            print_error!("{entry}");
        }
        log::Level::Warn => {
            print_warning!("{entry}");
        }
        log::Level::Info => {
            print_info!("{entry}");
        }
        log::Level::Debug | log::Level::Trace => {
            print_debug!("{entry}");
        }
    }
}

/// Print the serial ports available on this machine.
pub(crate) fn print_ports() -> ExitCode {
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            print_warning!("no serial ports found");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                match port.product {
                    Some(product) => {
                        print_info!("{} ({product})", port.name);
                    }
                    None => {
                        print_info!("{}", port.name);
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Send a control command to the running daemon.
pub(crate) fn send(runtime_dir: &Path, command: &Command) -> ExitCode {
    let api = UnixSocket::new(runtime_dir);
    match api.send_event(command) {
        Ok(()) => {
            print_info!("OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error!("failed to reach gameportd at {}: {e}", api.path().display());
            ExitCode::FAILURE
        }
    }
}
