// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Engines for integration tests that keep a full trace on disk.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use vturn_track::Tracker;
use vturn_track::tracker::{EntityLevels, TextTracker};

use crate::engine::Engine;

const TRACE_DIR: &str = "traces";

/// A tracker that writes every event at every level to
/// `traces/<stem of test_file>.log`.
///
/// Pass `file!()` so that each test file gets its own trace.
#[must_use]
pub fn create_tracker(test_file: &str) -> Tracker {
    fs::create_dir_all(TRACE_DIR).unwrap();
    let stem = Path::new(test_file).file_stem().unwrap().to_string_lossy();
    let file = File::create(Path::new(TRACE_DIR).join(format!("{stem}.log"))).unwrap();
    Rc::new(TextTracker::new(
        EntityLevels::new(log::Level::Trace),
        Box::new(BufWriter::new(file)),
    ))
}

/// An engine traced with [`create_tracker`].
#[must_use]
pub fn start_test<E>(test_file: &str) -> Engine<E> {
    Engine::new(&create_tracker(test_file))
}
