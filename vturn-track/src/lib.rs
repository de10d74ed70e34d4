// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! This module provides combined _track_ capabilities for the V-turn
//! fat-tree simulator.
//!
//! _Track_ means the combination of _log_ and _trace_ where:
//!
//!   - _log_ are text-based human-readable messages emitted at various levels
//!     of verbosity (from `Trace` through to `Error`).
//!   - _trace_ provides a standard set of modelling events that can be emitted.
//!     For example, packet creation/destruction or packets entering/exiting
//!     switches and servers ([`Entities`](crate::entity::Entity)).
//!
//! Every switch, server and device in the network owns an
//! [`Entity`](crate::entity::Entity) so that its messages can be filtered by
//! hierarchical name (e.g. `top::net::core_0_1`).

// Enable warnings for missing documentation
#![warn(missing_docs)]

pub use log;

pub mod builder;
pub mod entity;
pub mod id;
pub mod test_helpers;

/// Include the trackers.
pub mod tracker;

pub use id::Id;
pub use tracker::{Track, Tracker};

/// Destination of the text-based trackers.
pub type Writer = Box<dyn std::io::Write>;

/// Creator recorded for the top-level entity.
pub const NO_ID: Id = Id(0);

/// Reserved for the simulation as a whole. Never allocated to an entity.
pub const ROOT: Id = Id(1);

/// Run `$body` only if `$entity` is enabled at `$level`.
#[doc(hidden)]
#[macro_export]
macro_rules! if_enabled {
    ($entity:expr, $level:ident => $body:expr) => {
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::$level)
        {
            $body;
        }
    };
}

/// Record a packet arriving at an entity.
#[macro_export]
macro_rules! enter {
    ($entity:expr ; $obj_id:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.enter($entity.id, $obj_id))
    };
}

/// Record a packet leaving an entity.
#[macro_export]
macro_rules! exit {
    ($entity:expr ; $obj_id:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.exit($entity.id, $obj_id))
    };
}

/// Allocate a new [`Id`] from the entity's tracker.
#[macro_export]
macro_rules! create_id {
    ($entity:expr) => {
        $entity.tracker.unique_id()
    };
}

/// Record a creation.
///
/// `create!(entity)` records the entity itself being created by its parent.
/// `create!(entity ; obj, num_bytes)` records `entity` creating `obj`, which
/// must have an `id` field and implement `Display`.
#[macro_export]
macro_rules! create {
    ($entity:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.create(
            $entity.parent.as_ref().map_or($crate::NO_ID, |parent| parent.id),
            $entity.id,
            0,
            $entity.full_name(),
        ))
    };
    ($entity:expr ; $obj:expr, $num_bytes:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.create(
            $entity.id,
            $obj.id,
            $num_bytes,
            &$obj.to_string(),
        ))
    };
}

/// Record a destruction.
///
/// `destroy!(entity)` records the entity being destroyed by its parent.
/// `destroy!(entity ; obj_id)` records `entity` destroying `obj_id`.
#[macro_export]
macro_rules! destroy {
    ($entity:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.destroy(
            $entity.parent.as_ref().map_or($crate::NO_ID, |parent| parent.id),
            $entity.id,
        ))
    };
    ($entity:expr ; $obj_id:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.destroy($entity.id, $obj_id))
    };
}

/// Record the simulation time moving on.
#[macro_export]
macro_rules! set_time {
    ($entity:expr ; $time_ns:expr) => {
        $crate::if_enabled!($entity, Trace => $entity.tracker.time($entity.id, $time_ns))
    };
}

/// Log a message from an entity.
///
/// The arguments are only formatted if the entity logs at `$lvl`.
#[macro_export]
macro_rules! log_base {
    ($entity:expr ; $lvl:expr, $($arg:tt)+) => {
        if $entity.tracker.is_entity_enabled($entity.id, $lvl) {
            $entity.tracker.log($entity.id, $lvl, format_args!($($arg)+));
        }
    };
}

/// [`log_base`] at `Trace`, used for every routing decision.
#[macro_export]
macro_rules! trace {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::log_base!($entity ; $crate::log::Level::Trace, $($arg)+)
    };
}

/// [`log_base`] at `Debug`, used for detours.
#[macro_export]
macro_rules! debug {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::log_base!($entity ; $crate::log::Level::Debug, $($arg)+)
    };
}

/// [`log_base`] at `Info`.
#[macro_export]
macro_rules! info {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::log_base!($entity ; $crate::log::Level::Info, $($arg)+)
    };
}

/// [`log_base`] at `Warn`, used for bounces and drops.
#[macro_export]
macro_rules! warn {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::log_base!($entity ; $crate::log::Level::Warn, $($arg)+)
    };
}

/// [`log_base`] at `Error`.
#[macro_export]
macro_rules! error {
    ($entity:expr ; $($arg:tt)+) => {
        $crate::log_base!($entity ; $crate::log::Level::Error, $($arg)+)
    };
}
