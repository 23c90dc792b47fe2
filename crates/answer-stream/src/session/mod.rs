//! Session identity and identifier tracking.

mod state;

pub use state::{Identifiers, SessionId};
