//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  Diagnostics from the
//! engines go through `tracing` instead.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::snapshot::SyncReport;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a per-mount summary of a run, then every contained failure.
///
/// `verb` heads the count column, e.g. "Backed up" or "Restored".
pub fn print_report(verb: &str, report: &SyncReport) {
    if report.mounts().next().is_some() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Mount", verb, "Failed"]);

        for (mount, count) in report.mounts() {
            table.add_row(vec![
                mount.to_string(),
                count.to_string(),
                report.failure_count_for(mount).to_string(),
            ]);
        }

        println!("{table}");
    }

    for skipped in report.skipped() {
        warning(&format!("Skipped mount '{}': {}", skipped.mount, skipped.reason));
    }

    for failure in report.failures() {
        warning(&format!(
            "{}/{}: {}",
            failure.mount, failure.path, failure.error
        ));
    }
}
