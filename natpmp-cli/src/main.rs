use std::time::Duration;

use anyhow::Result;
use clap::Parser;

mod commands;
mod config;
mod logging;

use crate::commands::Cli;

fn main() -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .thread_name("main-runtime")
        .enable_all()
        .build()?;
    rt.block_on(main_impl())?;
    // give the runtime some time to finish, but do not wait indefinitely.
    rt.shutdown_timeout(Duration::from_millis(500));
    Ok(())
}

async fn main_impl() -> Result<()> {
    let cli = Cli::parse();
    logging::init_terminal_logging()?;
    cli.run().await
}
