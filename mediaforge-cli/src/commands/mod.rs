// mediaforge-cli/src/commands/mod.rs
//
// One submodule per CLI subcommand.

pub mod probe;
pub mod transcode;
