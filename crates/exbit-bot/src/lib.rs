//! Exbit spread market-making bot.
//!
//! Driver layer over the engine:
//! - Configuration loading (TOML)
//! - Account verification and session pre-checks
//! - Interactive menu and one-shot commands

pub mod app;
pub mod config;
pub mod error;
pub mod prompt;

pub use app::{Application, SessionPlan};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use prompt::Prompter;
