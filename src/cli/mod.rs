pub mod args;
pub mod commands;

pub use args::{Cli, Commands, SilverTable};
pub use commands::run;
