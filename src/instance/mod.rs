//! One running server instance as seen from outside.
//!
//! An [`InstanceHandle`] is owned by the cluster manager. The mutable
//! leadership/readiness view lives in an [`InstanceState`] shared with the
//! instance's log reader tasks; everything else reads it through
//! [`InstanceHandle::snapshot`].

mod handle;
mod ready;
mod state;
pub use handle::*;
pub use ready::*;
pub use state::*;
