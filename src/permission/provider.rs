//! OS permission subsystem abstraction.

use super::AuthorizationStatus;
use std::sync::{Arc, Mutex, MutexGuard};

/// Completion invoked with whether the user granted access.
pub type AccessCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// The platform's camera permission subsystem.
pub trait PermissionProvider: Send + Sync + 'static {
    /// Current camera authorization, read fresh.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Shows the OS prompt. `completion` may run on any thread, at any later
    /// time.
    fn request_access(&self, completion: AccessCompletion);

    /// Navigates to the system settings page for this app.
    fn open_settings(&self) {}
}

struct MockState {
    status: AuthorizationStatus,
    auto_response: Option<bool>,
    pending: Vec<AccessCompletion>,
    prompts: u32,
    status_checks: u32,
    settings_opened: u32,
}

/// Scriptable permission subsystem.
///
/// Prompts stay pending until [`MockPermissions::resolve`] is called, unless
/// an automatic response is configured.
#[derive(Clone)]
pub struct MockPermissions {
    state: Arc<Mutex<MockState>>,
}

impl MockPermissions {
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                status,
                auto_response: None,
                pending: Vec::new(),
                prompts: 0,
                status_checks: 0,
                settings_opened: 0,
            })),
        }
    }

    /// Undetermined status whose prompt answers immediately with `grant`.
    pub fn answering(grant: bool) -> Self {
        let mock = Self::new(AuthorizationStatus::Undetermined);
        mock.lock().auto_response = Some(grant);
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Changes the status as if the user edited it in system settings.
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.lock().status = status;
    }

    /// Answers every pending prompt. Returns the number answered.
    pub fn resolve(&self, grant: bool) -> usize {
        let pending = {
            let mut state = self.lock();
            state.status = AuthorizationStatus::from_grant(grant);
            std::mem::take(&mut state.pending)
        };
        let answered = pending.len();
        for completion in pending {
            completion(grant);
        }
        answered
    }

    /// Number of OS prompts shown.
    pub fn prompt_count(&self) -> u32 {
        self.lock().prompts
    }

    /// Number of times the authorization status was read.
    pub fn status_checks(&self) -> u32 {
        self.lock().status_checks
    }

    pub fn settings_opened(&self) -> u32 {
        self.lock().settings_opened
    }
}

impl PermissionProvider for MockPermissions {
    fn authorization_status(&self) -> AuthorizationStatus {
        let mut state = self.lock();
        state.status_checks += 1;
        state.status
    }

    fn request_access(&self, completion: AccessCompletion) {
        let auto = {
            let mut state = self.lock();
            state.prompts += 1;
            match state.auto_response {
                Some(grant) => {
                    state.status = AuthorizationStatus::from_grant(grant);
                    Some(grant)
                }
                None => {
                    state.pending.push(completion);
                    return;
                }
            }
        };
        if let Some(grant) = auto {
            completion(grant);
        }
    }

    fn open_settings(&self) {
        self.lock().settings_opened += 1;
        tracing::info!("MockPermissions opened system settings");
    }
}
