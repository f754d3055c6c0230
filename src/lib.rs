pub mod cli;
pub mod commands;
pub mod svgt;
pub mod utils;
