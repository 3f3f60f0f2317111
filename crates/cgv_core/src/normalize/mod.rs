pub mod identifier;

pub use identifier::{normalize_identifier, Identifier, NotANumber};
