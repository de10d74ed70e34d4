// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Named nodes in the model hierarchy.
//!
//! A fat-tree simulation builds a tree such as
//! `top::net::agg_0_1::port5` where each level owns an [`Entity`]. The full
//! name is what `--stdout-filter-regex` matches against, and the [`Id`] is
//! what appears in every trace line the entity emits.

use std::fmt;
use std::rc::Rc;

use crate::{Id, Tracker, create, destroy};

const JOIN: &str = "::";

/// A tracked part of the model.
pub struct Entity {
    /// Owning entity. Only the top level has none.
    pub parent: Option<Rc<Entity>>,

    /// Identifier emitted with every event from this entity.
    pub id: Id,

    /// Where events from this entity are sent.
    pub tracker: Tracker,

    full_name: String,
}

impl Entity {
    /// Create a child of `parent` called `name`.
    ///
    /// The child shares the parent's tracker.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let full_name = format!("{}{JOIN}{name}", parent.full_name);
        Self::register(parent.tracker.clone(), Some(parent.clone()), full_name)
    }

    fn register(tracker: Tracker, parent: Option<Rc<Entity>>, full_name: String) -> Self {
        let id = tracker.unique_id();
        tracker.add_entity(id, &full_name);
        let entity = Self {
            parent,
            id,
            tracker,
            full_name,
        };
        create!(entity);
        entity
    }

    /// The last component of the hierarchical name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.full_name.rfind(JOIN) {
            Some(pos) => &self.full_name[pos + JOIN.len()..],
            None => &self.full_name,
        }
    }

    /// The names of all ancestors and this entity joined by `::`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        destroy!(self);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({} {})", self.id, self.full_name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Create the root of the hierarchy.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    Rc::new(Entity::register(tracker.clone(), None, name.to_string()))
}
