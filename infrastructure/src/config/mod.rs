//! Configuration file loading for stagecraft
//!
//! This module handles file I/O and merging of configuration from
//! multiple sources. The priority order (highest to lowest):
//!
//! 1. Explicitly specified file
//! 2. Project root: `./stagecraft.toml` or `./.stagecraft.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/stagecraft/config.toml`
//! 4. Fallback: `~/.config/stagecraft/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{ConfigValidationError, FileConfig};
pub use loader::{ConfigLoadError, ConfigLoader};
