use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a message from the client side.
    Send(SendArgs),
    /// Run a server that prints received messages.
    Listen(ListenArgs),
    /// Run a server that echoes every message back to its sender.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format).await,
        Command::Listen(args) => listen::run(args, format).await,
        Command::Echo(args) => echo::run(args).await,
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug, Default)]
pub struct PipeArgs {
    /// Override the server-read pipe file name.
    #[arg(long, value_name = "NAME")]
    pub read_pipe: Option<String>,
    /// Override the server-write pipe file name.
    #[arg(long, value_name = "NAME")]
    pub write_pipe: Option<String>,
}

impl PipeArgs {
    pub fn to_config(&self) -> fifolink_endpoint::EndpointConfig {
        let mut config = fifolink_endpoint::EndpointConfig::default();
        if let Some(name) = &self.read_pipe {
            config = config.with_read_pipe_name(name);
        }
        if let Some(name) = &self.write_pipe {
            config = config.with_write_pipe_name(name);
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Directory holding the pipe pair.
    pub root: PathBuf,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    #[command(flatten)]
    pub pipes: PipeArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Directory holding the pipe pair (created FIFOs land here).
    pub root: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub pipes: PipeArgs,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Directory holding the pipe pair (created FIFOs land here).
    pub root: PathBuf,
    #[command(flatten)]
    pub pipes: PipeArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Pipe-pair root directory to check.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
    #[command(flatten)]
    pub pipes: PipeArgs,
}
