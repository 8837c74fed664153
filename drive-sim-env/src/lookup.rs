//! Lookup of actors by predicate.
use crate::{
    types::{match_type_id, ActorSnapshot},
    World,
};
use serde::{Deserialize, Serialize};

/// Returns the first actor, in id order, satisfying `predicate`.
pub fn find_actor<W, P>(world: &W, predicate: P) -> Option<ActorSnapshot>
where
    W: World + ?Sized,
    P: Fn(&ActorSnapshot) -> bool,
{
    let mut actors = world.actors();
    actors.sort_by_key(|a| a.id);
    actors.into_iter().find(|a| predicate(a))
}

/// Selects an actor by type id pattern and rank among the matches.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ActorSelector {
    /// Pattern matched against the type id, see [`match_type_id`].
    pub type_pattern: String,

    /// Rank among the matching actors in id order.
    pub nth: usize,
}

impl ActorSelector {
    pub fn new(type_pattern: impl Into<String>) -> Self {
        Self {
            type_pattern: type_pattern.into(),
            nth: 0,
        }
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }

    pub fn matches(&self, actor: &ActorSnapshot) -> bool {
        match_type_id(&actor.type_id, &self.type_pattern)
    }

    /// Returns the selected actor, if present.
    pub fn select<W: World + ?Sized>(&self, world: &W) -> Option<ActorSnapshot> {
        let mut actors: Vec<_> = world
            .actors()
            .into_iter()
            .filter(|a| self.matches(a))
            .collect();
        actors.sort_by_key(|a| a.id);
        actors.into_iter().nth(self.nth)
    }
}
