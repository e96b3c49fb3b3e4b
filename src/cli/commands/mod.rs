//! One module per subcommand.

pub mod backup;
pub mod completions;
pub mod restore;
