//! Camera permission handling.

mod gate;
mod provider;

pub use gate::{AuthorizationStatus, PermissionGate};
pub use provider::{AccessCompletion, MockPermissions, PermissionProvider};
