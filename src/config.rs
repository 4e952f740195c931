//! Environment-variable configuration (spec §6).
//!
//! `original_source/src/critter.h`'s `MPI_Init` macro reads `CRITTER_VIZ` and
//! `CRITTER_VIZ_FILE` inline, once, at process start. This module centralises the
//! equivalent into a single value produced at `Session::init` instead of scattering
//! `std::env` reads through the core.

use std::env;

/// Parsed environment configuration for one process.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Whether `CRITTER_VIZ` was set to any non-empty value.
    pub viz_enabled: bool,
    /// Base path from `CRITTER_VIZ_FILE`; `None` if `viz_enabled` is false.
    pub viz_file_base: Option<String>,
}

impl Config {
    /// Reads the environment exactly once. `viz_enabled` is true iff `CRITTER_VIZ`
    /// is set to a non-empty string; in that case `CRITTER_VIZ_FILE` is required
    /// and becomes the base path for the two output streams (spec §6).
    pub fn from_env() -> Self {
        let viz_enabled = env::var("CRITTER_VIZ")
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        let viz_file_base = if viz_enabled {
            env::var("CRITTER_VIZ_FILE").ok()
        } else {
            None
        };

        Config {
            viz_enabled: viz_enabled && viz_file_base.is_some(),
            viz_file_base,
        }
    }

    /// `<base>.txt`, the per-iteration path-cost stream.
    pub fn path_stream_path(&self) -> Option<String> {
        self.viz_file_base.as_ref().map(|base| format!("{base}.txt"))
    }

    /// `<base>track.txt`, the per-symbol cost stream.
    pub fn symbol_stream_path(&self) -> Option<String> {
        self.viz_file_base
            .as_ref()
            .map(|base| format!("{base}track.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let cfg = Config::default();
        assert!(!cfg.viz_enabled);
        assert!(cfg.path_stream_path().is_none());
    }

    #[test]
    fn stream_paths_derive_from_base() {
        let cfg = Config {
            viz_enabled: true,
            viz_file_base: Some("/tmp/run".to_string()),
        };
        assert_eq!(cfg.path_stream_path().unwrap(), "/tmp/run.txt");
        assert_eq!(cfg.symbol_stream_path().unwrap(), "/tmp/runtrack.txt");
    }
}
