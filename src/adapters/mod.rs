// Adapters layer: concrete implementations of the domain ports.

pub mod dom;
pub mod events;
pub mod http;
pub mod selector;
