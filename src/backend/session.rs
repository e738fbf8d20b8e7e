use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::platform::Credentials;

/// Outcome of reserving a backend address for a resource id
#[derive(Debug, Clone, PartialEq)]
pub enum AddressClaim {
    /// Nothing imported at this address yet
    Fresh,
    /// The same resource was already imported here during this session
    AlreadyImported,
    /// A different resource already occupies the address
    TakenBy(String),
}

/// State shared by every import of one export run.
///
/// Backend initialization happens at most once per session. The session also
/// remembers which resource id sits at each imported address so that
/// re-materializing a node does not import it twice.
pub struct ImportSession {
    working_dir: PathBuf,
    credentials: Credentials,
    verbose: bool,
    initialized: AtomicBool,
    imported: Mutex<HashMap<String, String>>,
}

impl ImportSession {
    pub fn new(working_dir: &Path, credentials: Credentials, verbose: bool) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            credentials,
            verbose,
            initialized: AtomicBool::new(false),
            imported: Mutex::new(HashMap::new()),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true exactly once: for the caller that must run initialization.
    /// The flag flips regardless of whether that initialization succeeds.
    pub fn begin_init(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn claim(&self, address: &str, resource_id: &str) -> AddressClaim {
        let imported = self.imported.lock().unwrap_or_else(|e| e.into_inner());
        match imported.get(address) {
            None => AddressClaim::Fresh,
            Some(existing) if existing == resource_id => AddressClaim::AlreadyImported,
            Some(existing) => AddressClaim::TakenBy(existing.clone()),
        }
    }

    /// Record a successful import
    pub fn record_import(&self, address: &str, resource_id: &str) {
        self.imported
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.to_string(), resource_id.to_string());
    }

    pub fn imported_count(&self) -> usize {
        self.imported.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ImportSession {
        ImportSession::new(Path::new("/out"), Credentials::new("t", "us1"), false)
    }

    #[test]
    fn test_init_claimed_once() {
        let session = session();
        assert!(!session.is_initialized());
        assert!(session.begin_init());
        assert!(!session.begin_init());
        assert!(!session.begin_init());
        assert!(session.is_initialized());
    }

    #[test]
    fn test_init_claimed_once_across_threads() {
        let session = std::sync::Arc::new(session());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = std::sync::Arc::clone(&session);
                std::thread::spawn(move || session.begin_init())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_address_claims() {
        let session = session();
        assert_eq!(session.claim("signalfx_dashboard.A", "D1"), AddressClaim::Fresh);

        session.record_import("signalfx_dashboard.A", "D1");
        assert_eq!(
            session.claim("signalfx_dashboard.A", "D1"),
            AddressClaim::AlreadyImported
        );
        assert_eq!(
            session.claim("signalfx_dashboard.A", "D2"),
            AddressClaim::TakenBy("D1".to_string())
        );
        assert_eq!(session.imported_count(), 1);
    }
}
