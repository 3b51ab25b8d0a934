pub mod check;
pub mod command;
pub mod config;
pub mod resolutions;
pub mod simulate;
