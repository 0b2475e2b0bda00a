//! # hp-types
//!
//! Core types shared by the Hopaas client crates: errors, search-space
//! suggestions and their wire encoding, sampler and pruner descriptors,
//! trial identity and snapshots.

pub mod errors;
pub mod properties;
pub mod pruner;
pub mod sampler;
pub mod suggestion;
pub mod trial;

pub use errors::*;
pub use properties::*;
pub use pruner::*;
pub use sampler::*;
pub use suggestion::*;
pub use trial::*;
