use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rustyline::DefaultEditor;
use tokio::runtime::Runtime;
use vellum_server::client::VellumClient;

mod commands;
mod display;
mod executor;
mod parser;

use display::OutputMode;
use executor::Workspace;

/// Vellum Console — interactive and scriptable CLI for the vellum search service.
#[derive(Parser, Debug)]
#[command(name = "vellum-console", version)]
struct Cli {
    /// Unix socket path to connect to (default: ~/.local/share/vellum/vellum.sock).
    #[arg(short, long)]
    socket: Option<String>,

    /// Execute a command non-interactively (can be repeated).
    #[arg(short, long = "exec")]
    exec: Vec<String>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long)]
    json: bool,
}

fn default_socket_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vellum")
        .join("vellum.sock")
}

fn main() {
    let cli = Cli::parse();

    let socket_path = cli
        .socket
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_socket_path);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    let mut client = match runtime.block_on(VellumClient::connect(&socket_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Cannot connect to server at {}: {e}\n\
                 Start a server with: vellum-server --socket {}",
                socket_path.display(),
                socket_path.display()
            );
            process::exit(1);
        }
    };

    if !cli.exec.is_empty() {
        let code = run_exec_mode(&mut client, &runtime, &cli.exec, cli.json);
        process::exit(code);
    } else if !std::io::stdin().is_terminal() {
        let code = run_pipe_mode(&mut client, &runtime, cli.json);
        process::exit(code);
    } else {
        run_repl(&mut client, &runtime);
    }
}

/// Execute one or more commands non-interactively (--exec mode).
///
/// Returns exit code: 0 = all succeeded, 1 = first error stops execution.
fn run_exec_mode(
    client: &mut VellumClient,
    rt: &Runtime,
    commands: &[String],
    json_mode: bool,
) -> i32 {
    let mode = if json_mode {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let mut ws = Workspace::new();

    for cmd_str in commands {
        let cmd = match parser::parse(cmd_str) {
            Ok(cmd) => cmd,
            Err(e) => {
                display::render_error(&e, &mode);
                return 1;
            }
        };

        match executor::execute(client, rt, &mut ws, cmd) {
            Ok(result) => {
                display::render(&result, &mode);
            }
            Err(e) => {
                display::render_error(&e, &mode);
                return 1;
            }
        }
    }

    0
}

/// Read commands from stdin (pipe mode).
///
/// Returns exit code: 0 = all succeeded, 1 = first error.
fn run_pipe_mode(client: &mut VellumClient, rt: &Runtime, json_mode: bool) -> i32 {
    let mode = if json_mode {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let mut ws = Workspace::new();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                display::render_error(&e, &mode);
                return 1;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let cmd = match parser::parse(trimmed) {
            Ok(cmd) => cmd,
            Err(e) => {
                display::render_error(&e, &mode);
                return 1;
            }
        };

        match executor::execute(client, rt, &mut ws, cmd) {
            Ok(result) => {
                if !display::render(&result, &mode) {
                    return 0; // EXIT command
                }
            }
            Err(e) => {
                display::render_error(&e, &mode);
                return 1;
            }
        }
    }

    0
}

/// Interactive REPL mode.
fn run_repl(client: &mut VellumClient, rt: &Runtime) {
    println!("Vellum Console v0.1.0");
    println!("Type HELP for available commands.\n");

    let mut rl = DefaultEditor::new().expect("failed to initialize line editor");
    let mut ws = Workspace::new();

    loop {
        let prompt = match &ws.project {
            Some(p) => format!("vellum:{p}/{}> ", ws.view.name()),
            None => "vellum> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let cmd = match parser::parse(trimmed) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        display::print_error(&e);
                        continue;
                    }
                };

                match executor::execute(client, rt, &mut ws, cmd) {
                    Ok(result) => {
                        if !display::render(&result, &OutputMode::Pretty) {
                            break; // EXIT command
                        }
                    }
                    Err(e) => display::print_error(&e),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!();
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("Bye!");
                break;
            }
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }
}
