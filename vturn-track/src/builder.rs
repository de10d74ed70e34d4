// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build the trackers selected on the command line.

use std::fs::File;
use std::io::{self, BufWriter};
use std::rc::Rc;

use crate::tracker::{EntityLevels, MultiTracker, TextTracker, TrackConfigError};
use crate::{Tracker, Writer};

/// Options for one tracker.
pub struct TrackerConfig<'a> {
    /// Whether this tracker is used at all.
    pub enable: bool,

    /// Level for entities selected by `filter_regex`, or for all entities
    /// when there is no filter.
    pub level: log::Level,

    /// Entities whose full name matches log at `level`. Others only log
    /// errors. Empty selects every entity.
    pub filter_regex: &'a str,

    /// File to write to. Required by the log file tracker.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

impl TrackerConfig<'_> {
    fn levels(&self) -> Result<EntityLevels, TrackConfigError> {
        if self.filter_regex.is_empty() {
            return Ok(EntityLevels::new(self.level));
        }
        let mut levels = EntityLevels::new(log::Level::Error);
        levels.add_filter(self.filter_regex, self.level)?;
        Ok(levels)
    }

    fn text_tracker(&self, writer: Writer) -> Result<Tracker, TrackConfigError> {
        Ok(Rc::new(TextTracker::new(self.levels()?, writer)))
    }
}

/// Options for the console and the log file.
pub struct TrackersConfig<'a> {
    /// Console output.
    pub stdout: TrackerConfig<'a>,

    /// Output to `log_file.file`.
    pub log_file: TrackerConfig<'a>,
}

fn stdout_writer() -> Writer {
    Box::new(BufWriter::new(io::stdout()))
}

fn file_writer(config: &TrackerConfig) -> Result<Writer, TrackConfigError> {
    let filename = config
        .file
        .ok_or_else(|| TrackConfigError("No filename given for the log file tracker".to_string()))?;
    let file = File::create(filename)
        .map_err(|e| TrackConfigError(format!("Unable to create {filename}: {e}")))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Create the tracker for a simulation run.
///
/// With neither tracker enabled, warnings and errors still go to stdout.
pub fn setup_trackers(config: &TrackersConfig) -> Result<Tracker, TrackConfigError> {
    let mut trackers = Vec::new();
    if config.stdout.enable {
        trackers.push(config.stdout.text_tracker(stdout_writer())?);
    }
    if config.log_file.enable {
        let writer = file_writer(&config.log_file)?;
        trackers.push(config.log_file.text_tracker(writer)?);
    }

    match trackers.len() {
        0 => TrackerConfig::default().text_tracker(stdout_writer()),
        1 => Ok(trackers.remove(0)),
        _ => {
            let mut multi = MultiTracker::default();
            trackers.into_iter().for_each(|t| multi.add_tracker(t));
            Ok(Rc::new(multi))
        }
    }
}
