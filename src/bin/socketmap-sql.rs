use std::{
    env,
    error::Error,
    io::{self, Write},
    path::PathBuf,
    process,
    time::Duration,
};

use clap::Parser;
use log::info;
use socketmap_sql::{
    Command, DebugClient, prompt,
    client::ClientError,
    config::{Config, DEFAULT_CONFIG_PATH},
    protocol::{ProtocolTransport, Session},
    storage::SqliteLookup,
    transform::TransformRegistry,
};

/// Database socketmap daemon.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Number of seconds to wait for a request before exiting
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
    /// Start with a debug client
    #[arg(long)]
    client: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to STDERR; STDOUT carries the protocol.
    env_logger::init();

    let cli = Cli::parse();
    let registry = TransformRegistry::with_builtins();
    let config = Config::from_file(&cli.config, &registry)?;

    if cli.client {
        return run_client();
    }

    let max_requests = config.misc.max_requests()?;
    let lookup = SqliteLookup::open(&config.database)?;
    let mut transport = ProtocolTransport::new(io::stdin(), io::stdout())?;

    let closed = Session::new(
        &config.tables,
        &config.misc,
        lookup,
        Duration::from_secs(cli.timeout),
    )
    .with_max_requests(max_requests)
    .serve(&mut transport)?;

    info!("exiting after {closed:?}");
    Ok(())
}

fn run_client() -> Result<(), Box<dyn Error>> {
    let program = env::current_exe()?;
    let args = env::args_os()
        .skip(1)
        .filter(|arg| arg.to_str() != Some("--client"));
    let mut client = DebugClient::spawn(program, args)?;

    let child = client.child();
    ctrlc::set_handler(move || {
        if let Ok(mut child) = child.lock() {
            let _ = child.kill();
        }
        process::exit(130);
    })?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    writeln!(stdout.lock(), "Type '.exit' to exit.")?;

    while client.is_running() {
        let cmd = match prompt(stdin.lock(), stdout.lock())? {
            Some(Command::Request(req)) => req,
            Some(Command::Exit) | None => break,
        };

        match client.query(&cmd) {
            Ok(reply) => writeln!(stdout.lock(), "{reply}")?,
            Err(e @ (ClientError::Closed | ClientError::Io(_))) => {
                eprintln!("{e}");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    client.terminate()?;
    Ok(())
}
