//! `vaultkeep restore`: replay a backup file into the secret store.

use crate::cli::output;
use crate::cli::{connect, encryption_key, load_settings, resolve_backup_path, resolve_format, Cli, FileArgs};
use crate::errors::Result;
use crate::snapshot::{format, restore, RestoreOptions};

/// Execute the `restore` command.
pub fn execute(
    cli: &Cli,
    mount_point: Option<&str>,
    dry_run: bool,
    file: &FileArgs,
) -> Result<()> {
    let settings = load_settings()?;
    let backup_format = resolve_format(file, &settings)?;
    let source = resolve_backup_path(file, &settings, backup_format);
    let key = encryption_key(file, false)?;

    // Decode everything up front: a bad key or a garbled file must fail
    // before the first write.
    let bytes = format::read_backup(&source)?;
    let document = format::decode(&bytes, backup_format, key.as_ref().map(|k| k.as_bytes()))?;

    let client = connect(cli, &settings)?;
    let options = RestoreOptions {
        mount_filter: mount_point.map(str::to_string),
        dry_run,
    };
    let report = restore(&client, &document, &options)?;

    let verb = if dry_run { "Would restore" } else { "Restored" };
    output::print_report(verb, &report);

    if dry_run {
        output::info(&format!(
            "Dry run: {} secrets would be restored from {}",
            report.secret_count(),
            source.display()
        ));
        output::tip("Run again without --dry-run to write them.");
    } else {
        output::success(&format!(
            "Restore complete! {} secrets restored from {}",
            report.secret_count(),
            source.display()
        ));
    }

    let failed = report.failures().len();
    if failed > 0 {
        output::warning(&format!("{failed} secrets could not be restored"));
    }

    Ok(())
}
