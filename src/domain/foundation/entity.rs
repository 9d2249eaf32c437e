//! Entity trait: identity plus a pending-event list.
//!
//! Entities raise events while handlers mutate them. The events stay on the
//! entity until a unit of work drains them with `take_events`.

use std::fmt;
use std::hash::Hash;

use super::DomainEvent;

/// An identifiable domain object that can carry undrained events.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identity type. Two instances with the same id are the same entity.
    type Id: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Event type raised by this entity.
    type Event: DomainEvent + Clone + fmt::Debug + 'static;

    /// Returns the entity identity.
    fn id(&self) -> Self::Id;

    /// Events raised since the last drain, oldest first.
    fn pending_events(&self) -> &[Self::Event];

    /// Drains and returns the pending events, oldest first.
    fn take_events(&mut self) -> Vec<Self::Event>;
}
