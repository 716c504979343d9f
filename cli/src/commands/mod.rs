//! CLI commands

mod init;
mod run;

pub use init::InitCommand;
pub use run::RunCommand;
