//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Identity is assigned by persistence, so an entity that has not been saved
/// yet reports no identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier, or `None` before first persistence.
    fn id(&self) -> Option<&Self::Id>;

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}
