use clap::Parser;
use epromman::error::EpromResult;
use ops::{BurnOptions, CheckOptions, DumpOptions, SplitOptions};

mod ops;

#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
enum Cli {
    /// Dump ROM contents to a file
    #[command(name = "dump", alias = "d")]
    Dump(DumpOptions),

    /// Fast dump: full 64 KB address space via the fast-read opcode
    #[command(name = "fdump", alias = "f")]
    Fdump(DumpOptions),

    /// Burn a ROM image file to the EPROM
    #[command(name = "burn", alias = "b")]
    Burn(BurnOptions),

    /// Check that the backend is connected and responsive
    #[command(name = "check", alias = "c")]
    Check(CheckOptions),

    /// Split an iNES cartridge image into PRG and CHR ROM files
    #[command(name = "split", alias = "s")]
    Split(SplitOptions),
}

fn main() -> EpromResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli {
        Cli::Dump(opts) => ops::handle_dump(opts, false)?,
        Cli::Fdump(opts) => ops::handle_dump(opts, true)?,
        Cli::Burn(opts) => ops::handle_burn(opts)?,
        Cli::Check(opts) => ops::handle_check(opts)?,
        Cli::Split(opts) => ops::handle_split(opts)?,
    }

    Ok(())
}
