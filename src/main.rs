use crate::commands::ctr::CtrCommands;
use crate::commands::{Cli, Commands};
use crate::nintendo::ctr::{
    convert_cdn_to_cia, decrypt_cia, describe_cia_file, generate_ticket_from_cdn, install_cdn_to_sd,
    verify_container,
};
use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

mod commands;
mod error;
mod nintendo;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let logger = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .build();

    let level = logger.filter();
    let pb = MultiProgress::new();

    LogWrapper::new(pb, logger).try_init()?;
    log::set_max_level(level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Ctr(inner) => match inner {
            CtrCommands::CdnToCia(cmd) => convert_cdn_to_cia(cmd).await?,
            CtrCommands::GenerateCdnTicket(cmd) => {
                generate_ticket_from_cdn(&cmd.cdn_dir, &cmd.output).await?
            }
            CtrCommands::DecryptCia(cmd) => decrypt_cia(&cmd.input, &cmd.output).await?,
            CtrCommands::Verify(cmd) => verify_container(&cmd.input).await?,
            CtrCommands::InstallCdn(cmd) => install_cdn_to_sd(&cmd.cdn_dir, &cmd.sd_root).await?,
            CtrCommands::DescribeCia(cmd) => describe_cia_file(&cmd.input).await?,
        },
    }

    Ok(())
}
