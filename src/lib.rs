// Viewer Rust library
// Ambient wind audio, animation damping and gesture playback

pub mod anim;
pub mod cli;
pub mod config;
pub mod gesture;
pub mod logging;
pub mod propfile;
pub mod sound;

pub use cli::Cli;
pub use config::Options;
pub use logging::LogLevel;
