//! Identities, ordered permission levels, and bearer-token models.

pub mod actor;
pub mod id;
pub mod level;
pub mod token;

pub use actor::*;
pub use id::*;
pub use level::*;
pub use token::{issued::*, record::*, secret::*};
