// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::fs;

use vturn_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use vturn_track::entity::{Entity, toplevel};
use vturn_track::{debug, info};

#[test]
fn file_tracker_applies_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.log");
    let path_str = path.to_str().unwrap();

    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: false,
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: true,
            level: log::Level::Debug,
            filter_regex: ".*core.*",
            file: Some(path_str),
        },
    };
    let tracker = setup_trackers(&config).unwrap();

    {
        let top = toplevel(&tracker, "top");
        let core = Entity::new(&top, "core_0_0");
        let edge = Entity::new(&top, "edge_0_0");

        debug!(core ; "detour via port 2");
        debug!(edge ; "backtrack out of port 6");
        info!(top ; "all links up");
    }
    tracker.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("DEBUG: detour via port 2"));
    assert!(!contents.contains("backtrack"));
    assert!(!contents.contains("links up"));
}

#[test]
fn file_tracker_needs_filename() {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: false,
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: true,
            file: None,
            ..Default::default()
        },
    };
    assert!(setup_trackers(&config).is_err());
}

#[test]
fn console_and_file_share_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("both.log");
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: true,
            level: log::Level::Error,
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: true,
            level: log::Level::Trace,
            filter_regex: "",
            file: path.to_str(),
        },
    };
    let tracker = setup_trackers(&config).unwrap();
    {
        let top = toplevel(&tracker, "top");
        let net = Entity::new(&top, "net");
        info!(net ; "built");
    }
    tracker.shutdown();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("created 3 top::net"));
    assert!(contents.contains("3:INFO: built"));
}

#[test]
fn bad_filter_is_reported() {
    let config = TrackersConfig {
        stdout: TrackerConfig {
            enable: true,
            filter_regex: "(",
            ..Default::default()
        },
        log_file: TrackerConfig {
            enable: false,
            ..Default::default()
        },
    };
    assert!(setup_trackers(&config).is_err());
}
