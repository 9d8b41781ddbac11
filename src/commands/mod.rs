pub mod btop;
pub mod consensus;
