//! Configuration for the EasyTL client.
//!
//! Configuration is TOML. The search order is:
//! 1. `./easytl.toml` (project-local)
//! 2. `~/.config/easytl/config.toml` (XDG config)
//!
//! A missing file means defaults; a present but invalid one is an error.
//!
//! ```rust,ignore
//! use easytl::config;
//!
//! let config = config::load()?;
//! let url = config.api.endpoint(&config.api.translate_path)?;
//! ```

mod file;
mod types;

pub use file::{from_path, from_str, load, load_from, search_paths, xdg_config_dir, xdg_data_dir};
pub use types::{ApiConfig, EasyTLConfig, TranslationDefaults};
