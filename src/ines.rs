//! Splitting iNES cartridge images into their PRG and CHR ROM parts,
//! so each part can be burnt to its own EPROM.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{EpromError, EpromResult};

const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
pub const INES_HEADER_SIZE: usize = 16;

const PRG_BANK_SIZE: usize = 16 * 1024;
const CHR_BANK_SIZE: usize = 8 * 1024;

/// ROM sizes declared by a 16-byte iNES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesInfo {
    pub prg_size_bytes: usize,
    /// Zero means the board uses CHR RAM and the file carries no CHR ROM.
    pub chr_size_bytes: usize,
}

/// Parse the fixed iNES header: magic "NES\x1A", PRG ROM size in 16 KB
/// units at byte 4, CHR ROM size in 8 KB units at byte 5.
pub fn parse_ines_header(header: &[u8]) -> EpromResult<InesInfo> {
    if header.len() < INES_HEADER_SIZE {
        return Err(EpromError::BadImageHeader(format!(
            "header is {} bytes, iNES header is {} bytes",
            header.len(),
            INES_HEADER_SIZE
        )));
    }
    if header[..4] != INES_MAGIC {
        return Err(EpromError::BadImageHeader(
            "iNES magic expected, did you try to open a .nes file?".to_string(),
        ));
    }

    Ok(InesInfo {
        prg_size_bytes: header[4] as usize * PRG_BANK_SIZE,
        chr_size_bytes: header[5] as usize * CHR_BANK_SIZE,
    })
}

/// Split a .nes file into `<stem>.prg` and `<stem>.chr` next to it (or
/// next to `outfile` when given). Returns the two paths written.
pub fn split_file(file: &Path, outfile: Option<&Path>) -> EpromResult<(PathBuf, PathBuf)> {
    let mut f = File::open(file)
        .map_err(|e| EpromError::ImageError(format!("Failed to open {}: {}", file.display(), e)))?;

    let mut header = [0u8; INES_HEADER_SIZE];
    f.read_exact(&mut header)
        .map_err(|e| EpromError::ImageError(format!("Failed to read header: {}", e)))?;
    let info = parse_ines_header(&header)?;

    let mut prg_rom = vec![0u8; info.prg_size_bytes];
    f.read_exact(&mut prg_rom)
        .map_err(|e| EpromError::ImageError(format!("Failed to read PRG ROM: {}", e)))?;
    let mut chr_rom = vec![0u8; info.chr_size_bytes];
    f.read_exact(&mut chr_rom)
        .map_err(|e| EpromError::ImageError(format!("Failed to read CHR ROM: {}", e)))?;

    let stem = outfile
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.with_extension(""));
    let prg_path = stem.with_extension("prg");
    let chr_path = stem.with_extension("chr");

    write_part(&prg_path, &prg_rom)?;
    write_part(&chr_path, &chr_rom)?;

    info!(
        "Split {} into {} ({} bytes) and {} ({} bytes)",
        file.display(),
        prg_path.display(),
        prg_rom.len(),
        chr_path.display(),
        chr_rom.len()
    );
    Ok((prg_path, chr_path))
}

fn write_part(path: &Path, data: &[u8]) -> EpromResult<()> {
    let mut f = File::create(path)
        .map_err(|e| EpromError::ImageError(format!("Failed to create {}: {}", path.display(), e)))?;
    f.write_all(data)
        .map_err(|e| EpromError::ImageError(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}
