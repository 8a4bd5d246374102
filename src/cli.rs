#[cfg(feature = "cli")]
use crate::dial::TlsDialer;
#[cfg(feature = "cli")]
use crate::error::Result;
#[cfg(feature = "cli")]
use crate::export::{export, parse_certificates, FanOut};
#[cfg(feature = "cli")]
use clap::{ArgAction, Parser};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use log::LevelFilter;
#[cfg(feature = "cli")]
use std::fs::File;
#[cfg(feature = "cli")]
use std::io::{self, Write};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "certdump")]
#[command(version, about = "Dump the TLS certificate chain a server presents as PEM", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'H',
        long,
        env = "CERTDUMP_HOST",
        default_value = "www.example.com",
        help = "Host name to connect to, e.g. www.google.com"
    )]
    pub host: String,

    #[arg(
        short,
        long,
        env = "CERTDUMP_PORT",
        default_value = "443",
        help = "Port to connect to"
    )]
    pub port: String,

    #[arg(
        short,
        long,
        env = "CERTDUMP_FILE",
        default_value = "server-cert.pem",
        help = "Output file where the certificates will be written"
    )]
    pub file: PathBuf,

    #[arg(
        short = 'k',
        long,
        help = "Skip verification of the certificate chain presented by the server"
    )]
    pub insecure: bool,

    #[arg(long, help = "Extra PEM trust anchors for verification")]
    pub ca_file: Option<PathBuf>,

    #[arg(long, help = "Only write the output file, not stdout")]
    pub no_stdout: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
}

#[cfg(feature = "cli")]
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(&cli)
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<()> {
    let mut dialer = TlsDialer::new(&cli.host, &cli.port, cli.insecure);

    if let Some(ca_path) = &cli.ca_file {
        let roots = parse_certificates(&std::fs::read_to_string(ca_path)?)?;
        log::debug!("loaded {} trust anchors from {}", roots.len(), ca_path.display());
        dialer = dialer.with_root_certificates(roots);
    }

    // Collect first so a failed dial leaves an existing output file alone.
    let mut bundle = Vec::new();
    export(&dialer, &mut bundle)?;

    let file = File::create(&cli.file)?;
    if cli.no_stdout {
        write_bundle(file, &bundle)?;
    } else {
        write_bundle(FanOut::new(io::stdout().lock(), file), &bundle)?;
    }

    eprintln!(
        "{}",
        format!("Saved to: {}", cli.file.display()).green()
    );

    Ok(())
}

#[cfg(feature = "cli")]
fn write_bundle<W: Write>(mut out: W, bundle: &[u8]) -> Result<()> {
    out.write_all(bundle)
        .and_then(|()| out.flush())
        .map_err(crate::error::Error::Write)
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
