mod app;
mod cli;
mod config;
mod console;
mod logging;

pub use app::run;
