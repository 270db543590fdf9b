//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stores key their maps by `Entity::id`, so every stored record implements it.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
