//! Records with a stable key.

/// A domain record that keeps its identity while its state changes.
///
/// `Order` is keyed by `OrderId`; `InventoryRecord` by its product code.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
