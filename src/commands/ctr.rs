use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Commands specific to CTR (3DS) formats
#[derive(Subcommand, Debug)]
pub enum CtrCommands {
    CdnToCia(CdnToCiaCommand),
    GenerateCdnTicket(GenerateCdnTicketCommand),
    DecryptCia(DecryptCiaCommand),
    Verify(VerifyCommand),
    InstallCdn(InstallCdnCommand),
    DescribeCia(DescribeCiaCommand),
}

/// Convert CDN content to CIA format
#[derive(Parser, Debug)]
#[command(
    long_about = "Convert CDN content to CIA format\n\nNote: By default the output CIA file is encrypted, if you want to decrypt it after conversion, use the --decrypt flag"
)]
#[derive(Clone)]
pub struct CdnToCiaCommand {
    /// Path to the CDN content directory
    #[arg(value_name = "CDN_DIR")]
    pub cdn_dir: PathBuf,

    /// Output CIA file path, defaults to the folder name with .cia extension
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Whether to clean up the CDN directory after conversion
    #[arg(
        value_name = "CLEANUP",
        long,
        short = 'C',
        help = "cleans up after conversion by removing the original CDN files",
        default_value = "false"
    )]
    pub cleanup: bool,

    #[arg(
        value_name = "RECURSIVE",
        long,
        short = 'R',
        help = "recursively iterates through all dictionaries in the CDN_DIR directory and convert each to a CIA file",
        default_value = "false"
    )]
    pub recursive: bool,

    #[arg(
        value_name = "ENSURE_TICKET_EXISTS",
        long,
        short = 'T',
        help = "ensures that a Ticket file exists in the CDN_DIR directory, if not it will generate one",
        default_value = "false"
    )]
    pub ensure_ticket_exists: bool,

    #[arg(
        value_name = "DECRYPT",
        long,
        short = 'D',
        help = "decrypts the CIA file after conversion, useful for emulators like Azahar",
        default_value = "false"
    )]
    pub decrypt: bool,
}

/// Generate a Ticket file from CDN content
#[derive(Parser, Debug)]
#[command(
    long_about = "Generate a Ticket file from CDN content\n\nNote: that this Ticket file is not official from Nintendo\nInstead it has non-important data like Console ID set to null, a CIA file build with this ticket will not work on a Stock 3DS but fine on emulators or a 3DS with custom firmware"
)]
pub struct GenerateCdnTicketCommand {
    /// Path to the CDN content directory
    #[arg(value_name = "CDN_DIR")]
    pub cdn_dir: PathBuf,

    /// Output Ticket file path
    #[arg(value_name = "OUTPUT", default_value = "ticket.tik")]
    pub output: PathBuf,
}

/// Decrypts a CIA file
#[derive(Parser, Debug)]
pub struct DecryptCiaCommand {
    /// Input CIA file path
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output decrypted CIA file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

/// Verifies a CIA, NCCH, NCSD or HandheldROM container's recorded hashes
#[derive(Parser, Debug)]
#[command(
    long_about = "Verifies a container's recorded hashes against its actual content\n\nAccepts a CIA, a single NCCH (CXI/CFA), an NCSD cart dump, or a HandheldROM (.nds/.srl) file. Reports every failing region instead of stopping at the first one."
)]
pub struct VerifyCommand {
    /// Path to the container file to verify
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

/// Installs a CDN content directory onto an SD/NAND directory tree
#[derive(Parser, Debug)]
#[command(
    long_about = "Installs a CDN content directory onto a drive root, laying out title/<hi>/<lo>/content, the TMD, a generated ContentManifest and in-memory title/ticket database rows\n\nNo real title.db/ticket.db binary format is written; rows only live for the duration of this process."
)]
pub struct InstallCdnCommand {
    /// Path to the CDN content directory
    #[arg(value_name = "CDN_DIR")]
    pub cdn_dir: PathBuf,

    /// Root directory to install onto (an SD card mount point, or any scratch directory)
    #[arg(value_name = "SD_ROOT")]
    pub sd_root: PathBuf,
}

/// Reports a CIA's ticket/legitimacy info without modifying it
#[derive(Parser, Debug)]
#[command(
    long_about = "Reports whether a CIA's ticket looks Nintendo-issued or self-built, and whether its content actually hashes to what the TMD records, mirroring GodMode9's CIA checker info screen"
)]
pub struct DescribeCiaCommand {
    /// Path to the CIA file to describe
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}
