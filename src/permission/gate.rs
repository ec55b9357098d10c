//! Camera authorization gate.
//!
//! Status moves one way, `Undetermined → Authorized | Denied`, within a
//! session. The user can still change it in system settings while the app is
//! in the background, so the gate never caches it.

use super::provider::PermissionProvider;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Camera authorization as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    /// Blocked by policy (parental controls, device management).
    Restricted,
    Undetermined,
}

impl AuthorizationStatus {
    /// Maps a prompt answer to the resulting status.
    pub fn from_grant(granted: bool) -> Self {
        if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        }
    }

    #[inline]
    pub fn is_authorized(self) -> bool {
        self == AuthorizationStatus::Authorized
    }

    /// Denied or restricted: only the user can fix it, in settings.
    #[inline]
    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted
        )
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorizationStatus::Authorized => "authorized",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::Undetermined => "undetermined",
        };
        f.write_str(s)
    }
}

/// Queries and requests camera authorization.
#[derive(Clone)]
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    prompt_in_flight: Arc<AtomicBool>,
}

impl PermissionGate {
    pub fn new(provider: Arc<dyn PermissionProvider>) -> Self {
        Self {
            provider,
            prompt_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reads the current status from the OS.
    pub fn check_status(&self) -> AuthorizationStatus {
        let status = self.provider.authorization_status();
        tracing::trace!(%status, "Checked camera authorization");
        status
    }

    /// Shows the OS prompt if the status is undetermined.
    ///
    /// `completion` receives the resulting status, possibly on another
    /// thread. Returns `false` without prompting when the status is already
    /// decided or a prompt is already showing; `completion` is then dropped
    /// uncalled.
    pub fn request_permission<F>(&self, completion: F) -> bool
    where
        F: FnOnce(AuthorizationStatus) + Send + 'static,
    {
        let status = self.check_status();
        if status != AuthorizationStatus::Undetermined {
            tracing::debug!(%status, "Authorization already determined; request ignored");
            return false;
        }
        if self.prompt_in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("Permission prompt already showing");
            return false;
        }

        tracing::info!("Requesting camera permission");
        let in_flight = Arc::clone(&self.prompt_in_flight);
        self.provider.request_access(Box::new(move |granted| {
            in_flight.store(false, Ordering::SeqCst);
            let status = AuthorizationStatus::from_grant(granted);
            tracing::info!(%status, "Camera permission resolved");
            completion(status);
        }));
        true
    }

    /// True while an OS prompt is waiting for the user.
    pub fn is_prompting(&self) -> bool {
        self.prompt_in_flight.load(Ordering::SeqCst)
    }

    /// Hands the user off to system settings.
    pub fn open_settings(&self) {
        self.provider.open_settings();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::MockPermissions;
    use std::sync::Mutex;

    fn gate(mock: &MockPermissions) -> PermissionGate {
        PermissionGate::new(Arc::new(mock.clone()))
    }

    #[test]
    fn test_status_is_read_fresh() {
        let mock = MockPermissions::new(AuthorizationStatus::Denied);
        let gate = gate(&mock);
        assert_eq!(gate.check_status(), AuthorizationStatus::Denied);

        mock.set_status(AuthorizationStatus::Authorized);
        assert_eq!(gate.check_status(), AuthorizationStatus::Authorized);
    }

    #[test]
    fn test_request_when_decided_is_noop() {
        let mock = MockPermissions::new(AuthorizationStatus::Authorized);
        let gate = gate(&mock);

        assert!(!gate.request_permission(|_| panic!("completion must not run")));
        assert_eq!(mock.prompt_count(), 0);
    }

    #[test]
    fn test_prompt_shown_once_while_pending() {
        let mock = MockPermissions::new(AuthorizationStatus::Undetermined);
        let gate = gate(&mock);
        let results = Arc::new(Mutex::new(Vec::new()));

        let r = Arc::clone(&results);
        assert!(gate.request_permission(move |s| r.lock().unwrap().push(s)));
        assert!(gate.is_prompting());
        assert!(!gate.request_permission(|_| {}));
        assert_eq!(mock.prompt_count(), 1);

        mock.resolve(true);
        assert!(!gate.is_prompting());
        assert_eq!(*results.lock().unwrap(), vec![AuthorizationStatus::Authorized]);

        // Decided now; further requests are ignored.
        assert!(!gate.request_permission(|_| {}));
        assert_eq!(mock.prompt_count(), 1);
    }

    #[test]
    fn test_denial_maps_to_denied() {
        let mock = MockPermissions::answering(false);
        let gate = gate(&mock);
        let results = Arc::new(Mutex::new(Vec::new()));

        let r = Arc::clone(&results);
        gate.request_permission(move |s| r.lock().unwrap().push(s));

        assert_eq!(*results.lock().unwrap(), vec![AuthorizationStatus::Denied]);
        assert!(AuthorizationStatus::Denied.is_blocked());
        assert!(AuthorizationStatus::Restricted.is_blocked());
        assert!(!AuthorizationStatus::Undetermined.is_blocked());
    }
}
