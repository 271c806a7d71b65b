//! Values without identity.

/// Marker for domain values compared by their contents.
///
/// `Money` and `OrderItem` implement it: two line items for the same product,
/// quantity and price are interchangeable, whereas two orders with equal
/// fields but different ids are not (see [`crate::Entity`]).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
