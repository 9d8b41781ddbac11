pub mod cli;
pub mod commands;
pub mod consensus;
pub mod reads;
pub mod utils;
