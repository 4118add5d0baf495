use std::io;
use std::process::ExitCode;

use clap::Parser;
use dsense::{
    report::{render, ReportOptions},
    usb::UsbBackend,
};

/// List connected depth cameras and their capabilities.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Provide a short summary of the devices
    #[arg(short, long)]
    short: bool,

    /// Show all supported options per subdevice
    #[arg(short, long)]
    option: bool,

    /// Show all supported stream modes per subdevice
    #[arg(short, long)]
    modes: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> dsense::Result<()> {
    let backend = UsbBackend::new()?;
    let stdout = io::stdout();
    render(
        &mut stdout.lock(),
        &backend,
        ReportOptions {
            compact: args.short,
            show_options: args.option,
            show_modes: args.modes,
        },
    )
}
