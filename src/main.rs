use clap::Parser;
use vaultkeep::cli::{init_logging, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match cli.command {
        Commands::Backup {
            ref mount_point,
            ref path,
            ref file,
        } => vaultkeep::cli::commands::backup::execute(
            &cli,
            mount_point.as_deref(),
            path.as_deref(),
            file,
        ),
        Commands::Restore {
            ref mount_point,
            dry_run,
            ref file,
        } => vaultkeep::cli::commands::restore::execute(&cli, mount_point.as_deref(), dry_run, file),
        Commands::Completions { shell } => vaultkeep::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        vaultkeep::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
