//! Command-line front end: `aix-user [-L <path>] [-s] [-l] [-d] [-g <port>]
//! <xcoff-binary> [args...]`.
//!
//! Argument parsing, log wiring, and the host environment hand-off live
//! here; everything about actually running the guest belongs to
//! [`aix_user::vm`].

use aix_user::cpu::UnicornBackend;
use aix_user::vm::{self, VmConfig};
use std::path::PathBuf;
use std::process::ExitCode;

struct Args {
    library_search_paths: Vec<PathBuf>,
    trace_syscalls: bool,
    trace_loader: bool,
    debug_server: bool,
    debug_port: u16,
    binary: PathBuf,
    guest_args: Vec<String>,
}

fn usage() -> ! {
    eprintln!("usage: aix-user [-L <lib-search-path>] [-s] [-l] [-d] [-g <port>] <xcoff-binary> [args...]");
    std::process::exit(64);
}

fn parse_args() -> Args {
    let mut raw = std::env::args().skip(1);
    let mut library_search_paths = Vec::new();
    let mut trace_syscalls = false;
    let mut trace_loader = false;
    let mut debug_server = false;
    let mut debug_port: u16 = 1234;
    let mut binary = None;
    let mut guest_args = Vec::new();

    while let Some(arg) = raw.next() {
        if binary.is_some() {
            guest_args.push(arg);
            continue;
        }
        match arg.as_str() {
            "-L" => {
                let path = raw.next().unwrap_or_else(|| usage());
                library_search_paths.push(PathBuf::from(path));
            }
            "-s" => trace_syscalls = true,
            "-l" => trace_loader = true,
            "-d" => debug_server = true,
            "-g" => {
                let port = raw.next().unwrap_or_else(|| usage());
                debug_port = port.parse().unwrap_or_else(|_| usage());
            }
            _ => binary = Some(PathBuf::from(arg)),
        }
    }

    if library_search_paths.is_empty() {
        library_search_paths.push(PathBuf::from("."));
    }

    let binary = binary.unwrap_or_else(|| usage());

    if debug_server {
        log::warn!(target: "vm", "-d/-g requested a debug server; this build has none, continuing without it (port {})", debug_port);
    }

    Args {
        library_search_paths,
        trace_syscalls,
        trace_loader,
        debug_server,
        debug_port,
        binary,
        guest_args,
    }
}

fn init_logging(args: &Args) {
    let mut log = stderrlog::new();
    log.verbosity(if args.trace_syscalls || args.trace_loader { 3 } else { 1 });
    if args.trace_syscalls {
        log.module("aix_user::syscalls");
        log.module("aix_user::unix_shim");
    }
    if args.trace_loader {
        log.module("aix_user::linker");
    }
    log.init().expect("logging can only be initialized once");
}

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);
    let _ = args.debug_port;

    let config = VmConfig {
        binary: args.binary,
        args: args.guest_args,
        env: std::env::vars().map(|(k, v)| format!("{}={}", k, v)).collect(),
        library_search_paths: args.library_search_paths,
    };

    let cpu = match UnicornBackend::new() {
        Ok(cpu) => cpu,
        Err(err) => {
            eprintln!("aix-user: failed to start cpu core: {}", err);
            return ExitCode::from(1);
        }
    };

    // `vm::run` only returns on a host-side abort; the guest's own `_exit`
    // terminates this process directly from inside a syscall handler.
    match vm::run(cpu, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("aix-user: {}", err);
            ExitCode::from(1)
        }
    }
}
