//! Session control (spec §4.3): `start()`/`stop()` lifecycle, first-iteration
//! detection, and output emission.

use crate::clock;
use crate::config::Config;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Process-wide session state (spec §3, `SessionState`). Mutated only inside
/// `start()`, `stop()`, `Session::init`, and `Session::finalize`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub tracking_enabled: bool,
    pub first_iteration: bool,
    pub need_newline: bool,
    pub viz_enabled: bool,
}

impl SessionState {
    fn new(viz_enabled: bool) -> Self {
        SessionState {
            tracking_enabled: false,
            first_iteration: true,
            need_newline: false,
            viz_enabled,
        }
    }
}

/// Output streams opened on the world root at `init`, flushed at `stop()`, closed
/// at `finalize()`. `Drop` is the guaranteed-release backstop for abnormal
/// termination (spec §5).
#[derive(Debug, Default)]
pub struct Streams {
    path_stream: Option<BufWriter<File>>,
    symbol_stream: Option<BufWriter<File>>,
}

impl Streams {
    /// Opens both streams on the world root only, if `CRITTER_VIZ`/`CRITTER_VIZ_FILE`
    /// are set. Non-root ranks always hold `None` (spec §9 open question, resolved:
    /// non-root streams are never opened).
    fn open(config: &Config, is_world_root: bool) -> Result<Self> {
        if !is_world_root || !config.viz_enabled {
            return Ok(Streams::default());
        }

        let path_path = config.path_stream_path().expect("viz_enabled implies a base path");
        let symbol_path = config.symbol_stream_path().expect("viz_enabled implies a base path");

        let path_stream = File::create(&path_path)
            .map(BufWriter::new)
            .map_err(|source| Error::StreamIoFailure { path: path_path, source })?;
        let symbol_stream = File::create(&symbol_path)
            .map(BufWriter::new)
            .map_err(|source| Error::StreamIoFailure { path: symbol_path, source })?;

        Ok(Streams { path_stream: Some(path_stream), symbol_stream: Some(symbol_stream) })
    }

    /// Space-separated scalars in fixed component order, newline-terminated (spec
    /// §6). No-op if this rank never opened the stream.
    fn write_path_line(&mut self, data: &[f64]) -> Result<()> {
        let Some(stream) = self.path_stream.as_mut() else { return Ok(()) };
        let line = data.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(stream, "{line}").map_err(|source| Error::StreamIoFailure {
            path: "<path stream>".to_string(),
            source,
        })
    }

    /// `name inclusive8 exclusive8`, one line per region (spec §6).
    fn write_symbol_line(&mut self, name: &str, inclusive: &[f64], exclusive: &[f64]) -> Result<()> {
        let Some(stream) = self.symbol_stream.as_mut() else { return Ok(()) };
        let incl = inclusive.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        let excl = exclusive.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(stream, "{name} {incl} {excl}").map_err(|source| Error::StreamIoFailure {
            path: "<symbol stream>".to_string(),
            source,
        })
    }

    fn flush(&mut self) {
        if let Some(s) = self.path_stream.as_mut() {
            let _ = s.flush();
        }
        if let Some(s) = self.symbol_stream.as_mut() {
            let _ = s.flush();
        }
    }

    fn close(&mut self) {
        self.flush();
        self.path_stream = None;
        self.symbol_stream = None;
    }
}

impl Drop for Streams {
    /// Guaranteed-release backstop: if a panic or early return skips the normal
    /// `Session::finalize()`/`dispatch::stop()` path, the buffered writers still
    /// get flushed here before their underlying files close.
    fn drop(&mut self) {
        self.flush();
    }
}

/// `Session` bundles the ambient lifecycle bookkeeping that isn't itself part of
/// the path-decomposition algorithm (spec §4.3/§5/§6): timers, world-root
/// detection, and the two output streams.
#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub config: Config,
    pub is_world_root: bool,
    pub start_time: f64,
    streams: Streams,
}

impl Session {
    /// Reads the environment and opens the output streams (world root only).
    /// Called once, between MPI init and the first `start()`.
    pub fn init(is_world_root: bool) -> Result<Self> {
        let config = Config::from_env();
        let streams = Streams::open(&config, is_world_root).or_else(|err| {
            tracing::error!(error = %err, "failed to open critter output streams, disabling viz");
            Ok::<_, Error>(Streams::default())
        })?;
        Ok(Session {
            state: SessionState::new(config.viz_enabled && is_world_root),
            config,
            is_world_root,
            start_time: 0.0,
            streams,
        })
    }

    pub fn begin_iteration(&mut self) {
        self.state.tracking_enabled = true;
        self.start_time = clock::now();
    }

    pub fn end_iteration(&mut self) {
        self.state.tracking_enabled = false;
        self.state.first_iteration = false;
    }

    pub fn runtime(&self) -> f64 {
        clock::now() - self.start_time
    }

    /// The `print(n, data)` user-facing primitive (spec §6): writes `data` as a
    /// space-separated, newline-terminated line to the path stream. On a write
    /// failure, `viz` is disabled for the remainder of the run and one diagnostic
    /// is logged (spec §7, `StreamIoFailure`).
    pub fn print(&mut self, data: &[f64]) {
        if let Err(err) = self.streams.write_path_line(data) {
            tracing::error!(error = %err, "critter: disabling viz output after a stream write failure");
            self.state.viz_enabled = false;
            self.streams.close();
        }
    }

    pub fn print_symbol(&mut self, name: &str, inclusive: &[f64], exclusive: &[f64]) {
        if let Err(err) = self.streams.write_symbol_line(name, inclusive, exclusive) {
            tracing::error!(error = %err, "critter: disabling viz output after a symbol stream write failure");
            self.state.viz_enabled = false;
            self.streams.close();
        }
    }

    pub fn flush(&mut self) {
        self.streams.flush();
    }

    /// Closes the streams on the world root, called once at finalize.
    pub fn finalize(&mut self) {
        self.streams.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_session_never_opens_streams() {
        let session = Session::init(true).unwrap();
        assert!(!session.state.viz_enabled || session.config.viz_enabled);
    }

    #[test]
    fn non_root_never_opens_streams_even_if_viz_enabled() {
        let config = Config { viz_enabled: true, viz_file_base: Some("/tmp/critter-test".into()) };
        let streams = Streams::open(&config, false).unwrap();
        assert!(streams.path_stream.is_none());
        assert!(streams.symbol_stream.is_none());
    }
}
