//! `orderflow-core`: identifiers, money and the domain error shared by every
//! other crate. No IO.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::OrderId;
pub use money::Money;
pub use value_object::ValueObject;
