use bamcons::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{btop, consensus},
    utils::{handle_error_and_exit, Result},
};
use clap::Parser;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Consensus(_) => "consensus",
        Command::Btop(_) => "btop",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Consensus(args) => consensus::consensus(args)?,
        Command::Btop(args) => btop::btop(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
