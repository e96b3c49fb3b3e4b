//! `vaultkeep backup`: capture secrets into a backup file.

use crate::cli::output;
use crate::cli::{connect, encryption_key, load_settings, resolve_backup_path, resolve_format, Cli, FileArgs};
use crate::errors::Result;
use crate::snapshot::{capture, format};

/// Execute the `backup` command.
pub fn execute(
    cli: &Cli,
    mount_point: Option<&str>,
    path: Option<&str>,
    file: &FileArgs,
) -> Result<()> {
    let settings = load_settings()?;
    let backup_format = resolve_format(file, &settings)?;
    let dest = resolve_backup_path(file, &settings, backup_format);

    // Key first, before any store traffic.
    let key = encryption_key(file, true)?;

    let client = connect(cli, &settings)?;
    let outcome = capture(&client, mount_point, path)?;
    output::print_report("Backed up", &outcome.report);

    if outcome.document.is_empty() {
        output::info("Nothing to write. Skipping file creation.");
        return Ok(());
    }

    let bytes = format::encode(
        &outcome.document,
        backup_format,
        key.as_ref().map(|k| k.as_bytes()),
    )?;
    format::write_backup(&dest, &bytes)?;

    let kind = if key.is_some() { "encrypted" } else { "non-encrypted" };
    output::success(&format!(
        "Backed up {} secrets to {} ({kind}, format: {backup_format})",
        outcome.report.secret_count(),
        dest.display()
    ));

    let failed = outcome.report.failures().len();
    if failed > 0 {
        output::warning(&format!(
            "{failed} secrets or folders could not be read and are missing from the backup"
        ));
    }

    Ok(())
}
