use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use epromman::{Eprom, SerialParams, error::EpromResult, ines};
use tracing::info;

#[derive(Parser, Debug, Clone)]
pub(crate) struct LinkOptions {
    /// Serial port. E.g. /dev/ttyS0
    #[clap(short, long, default_value = "/dev/ttyS0")]
    port: String,

    /// USART baud rate. E.g. 38400
    #[clap(short, long, default_value_t = 38400)]
    baudrate: u32,
}

impl LinkOptions {
    fn serial_params(&self) -> SerialParams {
        SerialParams {
            port: self.port.clone(),
            baud: self.baudrate,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct DumpOptions {
    #[clap(flatten)]
    link: LinkOptions,

    /// Rom size in kbits. E.g. 256 for 27c256
    #[clap(short, long, default_value_t = 1024)]
    size: u32,

    /// Output file; defaults to <timestamp>.<command>
    #[clap(short = 'O', long)]
    outfile: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct BurnOptions {
    #[clap(flatten)]
    link: LinkOptions,

    /// Rom size in kbits. E.g. 256 for 27c256
    #[clap(short, long, default_value_t = 1024)]
    size: u32,

    /// Input ROM image file
    #[clap(short, long)]
    infile: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct CheckOptions {
    #[clap(flatten)]
    link: LinkOptions,
}

#[derive(Parser, Debug, Clone)]
pub(crate) struct SplitOptions {
    /// iNES (.nes) file to split
    file: PathBuf,

    /// Output file stem; defaults to the input file without extension
    #[clap(short = 'O', long)]
    outfile: Option<PathBuf>,
}

/// Output filename for dumps when none was given: unix timestamp plus
/// the command name, e.g. `1756500000.dump`.
fn default_outfile(cmd_name: &str) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("{}.{}", secs, cmd_name))
}

pub(crate) fn handle_dump(opts: DumpOptions, fast: bool) -> EpromResult<()> {
    let cmd_name = if fast { "fdump" } else { "dump" };
    let outfile = opts.outfile.unwrap_or_else(|| default_outfile(cmd_name));

    let mut eprom = Eprom::open(&opts.link.serial_params())?;
    eprom.progress_bar(true);

    let written = eprom.dump_to_file(&outfile, opts.size, fast)?;
    info!(
        "Successfully dumped {} bytes to {} file",
        written,
        outfile.display()
    );
    Ok(())
}

pub(crate) fn handle_burn(opts: BurnOptions) -> EpromResult<()> {
    let mut eprom = Eprom::open(&opts.link.serial_params())?;
    eprom.progress_bar(true);

    eprom.burn_file(&opts.infile, opts.size)?;
    info!(
        "Successfully burnt {} file to eprom",
        opts.infile.display()
    );
    Ok(())
}

pub(crate) fn handle_check(opts: CheckOptions) -> EpromResult<()> {
    let mut eprom = Eprom::open(&opts.link.serial_params())?;
    let ident = eprom.check()?;

    info!("Backend is ready: {}", String::from_utf8_lossy(&ident));
    Ok(())
}

pub(crate) fn handle_split(opts: SplitOptions) -> EpromResult<()> {
    ines::split_file(&opts.file, opts.outfile.as_deref())?;
    Ok(())
}
