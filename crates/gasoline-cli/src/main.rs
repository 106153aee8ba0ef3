//! `gasoline` — CLI entry point and singleton daemon bridge (spec.md §4.9, §6).

mod bridge;
mod cli;
mod exit_codes;
mod logging;
mod paths;
mod server;
mod singleton;

use clap::Parser;
use cli::Cli;
use singleton::ProbeResult;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let cli = Cli::parse();
    let _logging_guard = logging::init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            std::process::exit(exit_codes::GENERIC);
        }
    };

    let code = runtime.block_on(run(cli));
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    if cli.daemon && cli.connect {
        eprintln!("--daemon and --connect are mutually exclusive");
        return exit_codes::BAD_FLAGS;
    }

    let pid_path = paths::pid_file_path(cli.port);

    if cli.stop {
        return run_stop(&pid_path);
    }

    if cli.check {
        return run_check(cli.port, &pid_path).await;
    }

    if cli.connect {
        return run_connect(cli.port).await;
    }

    run_server(cli, pid_path).await
}

fn run_stop(pid_path: &std::path::Path) -> i32 {
    match singleton::read_pid(pid_path) {
        Some(pid) if singleton::send_sigterm(pid) => {
            singleton::remove_pid_file(pid_path);
            println!("sent SIGTERM to pid {pid}");
            exit_codes::SUCCESS
        }
        Some(pid) => {
            eprintln!("failed to signal pid {pid}; removing stale pid file");
            singleton::remove_pid_file(pid_path);
            exit_codes::GENERIC
        }
        None => {
            eprintln!("no pid file at {}", pid_path.display());
            exit_codes::GENERIC
        }
    }
}

/// Shared by `--check` and the default startup path (spec.md §10): does
/// the pid file name a live process, and does it answer `/health` with a
/// matching `server_version`?
async fn inspect_pid_file(pid_path: &std::path::Path, port: u16) -> ProbeResult {
    match singleton::read_pid(pid_path) {
        Some(pid) if singleton::process_alive(pid) => {
            singleton::probe_existing_daemon(port, SERVER_VERSION).await
        }
        _ => ProbeResult::Unreachable,
    }
}

async fn run_check(port: u16, pid_path: &std::path::Path) -> i32 {
    match inspect_pid_file(pid_path, port).await {
        ProbeResult::Matching => {
            println!("daemon already running on port {port}, version matches ({SERVER_VERSION})");
            return exit_codes::SUCCESS;
        }
        ProbeResult::VersionMismatch => {
            eprintln!("daemon on port {port} is running a different version than {SERVER_VERSION}");
            return exit_codes::STALE_MISMATCH;
        }
        ProbeResult::Unreachable => {}
    }

    match singleton::bind_with_fast_fail(port).await {
        Ok(Some(_listener)) => {
            println!("port {port} is free");
            exit_codes::SUCCESS
        }
        Ok(None) => {
            eprintln!("port {port} is occupied by a process that is not a healthy gasoline daemon");
            exit_codes::PORT_IN_USE
        }
        Err(err) => {
            eprintln!("failed to probe port {port}: {err}");
            exit_codes::GENERIC
        }
    }
}

async fn run_connect(port: u16) -> i32 {
    match singleton::probe_existing_daemon(port, SERVER_VERSION).await {
        ProbeResult::Matching => match bridge::run(port).await {
            Ok(()) => exit_codes::SUCCESS,
            Err(err) => {
                eprintln!("bridge ended with an error: {err}");
                exit_codes::GENERIC
            }
        },
        ProbeResult::VersionMismatch => {
            eprintln!("daemon on port {port} does not match this client's version ({SERVER_VERSION})");
            exit_codes::STALE_MISMATCH
        }
        ProbeResult::Unreachable => {
            eprintln!("--connect requires an existing daemon on port {port}; none found");
            exit_codes::GENERIC
        }
    }
}

async fn run_server(cli: Cli, pid_path: std::path::PathBuf) -> i32 {
    // Step 1-2 (spec.md §4.9): an existing, version-matching daemon means
    // we bridge instead of binding.
    match inspect_pid_file(&pid_path, cli.port).await {
        ProbeResult::Matching => {
            return match bridge::run(cli.port).await {
                Ok(()) => exit_codes::SUCCESS,
                Err(err) => {
                    eprintln!("bridge ended with an error: {err}");
                    exit_codes::GENERIC
                }
            };
        }
        ProbeResult::VersionMismatch => {
            singleton::remove_pid_file(&pid_path);
        }
        ProbeResult::Unreachable => {
            if singleton::read_pid(&pid_path).is_some() {
                singleton::remove_pid_file(&pid_path);
            }
        }
    }

    if cli.daemon && !cli.daemon_child {
        return spawn_daemon_child(&cli);
    }

    // Step 3 (spec.md §4.9): bind with a 4s fast-fail.
    let listener = match singleton::bind_with_fast_fail(cli.port).await {
        Ok(Some(listener)) => listener,
        Ok(None) => {
            // Step 5: we lost the bind race; reattempt connect with backoff.
            if singleton::race_reconnect(cli.port, SERVER_VERSION).await {
                return match bridge::run(cli.port).await {
                    Ok(()) => exit_codes::SUCCESS,
                    Err(err) => {
                        eprintln!("bridge ended with an error: {err}");
                        exit_codes::GENERIC
                    }
                };
            }
            eprintln!("port {} already in use", cli.port);
            return exit_codes::PORT_IN_USE;
        }
        Err(err) => {
            eprintln!("fatal: failed to bind port {}: {err}", cli.port);
            return exit_codes::GENERIC;
        }
    };

    // Step 4: write pid, enter server mode.
    let pid = std::process::id();
    if let Err(err) = singleton::write_pid_atomic(&pid_path, pid) {
        eprintln!("fatal: failed to write pid file: {err}");
        return exit_codes::GENERIC;
    }

    let running = server::RunningServer::new(listener, cli.api_key.clone(), cli.server, cli.persist);
    match running.run(&pid_path).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            eprintln!("fatal: server exited with error: {err}");
            exit_codes::GENERIC
        }
    }
}

/// `--daemon`: re-exec this binary with stdio detached and `--daemon-child`
/// set, then the parent exits immediately (spec.md §6).
fn spawn_daemon_child(cli: &Cli) -> i32 {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            eprintln!("fatal: could not locate own executable: {err}");
            return exit_codes::GENERIC;
        }
    };

    let mut command = std::process::Command::new(exe);
    command
        .arg("--port")
        .arg(cli.port.to_string())
        .arg("--daemon-child")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    if cli.server {
        command.arg("--server");
    }
    if cli.persist {
        command.arg("--persist");
    }
    if let Some(key) = &cli.api_key {
        command.arg("--api-key").arg(key);
    }

    detach_new_session(&mut command);

    match command.spawn() {
        Ok(child) => {
            println!("daemon started in background, pid {}", child.id());
            exit_codes::SUCCESS
        }
        Err(err) => {
            eprintln!("fatal: failed to spawn daemon child: {err}");
            exit_codes::GENERIC
        }
    }
}

#[cfg(unix)]
fn detach_new_session(command: &mut std::process::Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach_new_session(_command: &mut std::process::Command) {}
