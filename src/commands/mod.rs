pub mod app_command;

pub use app_command::{AlphaAction, AppCommand, HELP_TEXT};
