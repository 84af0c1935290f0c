//! Process-wide session store holding the single bearer credential.
//!
//! The credential is the only state kept across restarts. When a session file
//! is configured, `set` writes the token to it and `clear` removes it. Readers
//! never block: `get` clones the current value out of a watch channel, and
//! `subscribe` lets the app shell notice a logout performed elsewhere.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::model::Credential;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Single-writer credential store. Clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Credential>>>,
    path: Option<PathBuf>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            path: None,
        }
    }

    /// Open (or prepare) a session file, loading any credential already in it.
    pub fn open(path: PathBuf) -> Result<Self, SessionError> {
        let initial = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| Credential::new(token))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), restored = initial.is_some(), "session file opened");
        let (tx, _) = watch::channel(initial);
        Ok(Self {
            tx: Arc::new(tx),
            path: Some(path),
        })
    }

    pub fn get(&self) -> Option<Credential> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Store `credential`, replacing any previous one.
    ///
    /// The in-memory value is updated even if persisting it fails.
    pub fn set(&self, credential: Credential) -> Result<(), SessionError> {
        let token = credential.token().to_string();
        self.tx.send_replace(Some(credential));
        info!("session started");
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, token)?;
        }
        Ok(())
    }

    /// Drop the credential. Subscribers observe `None`.
    pub fn clear(&self) -> Result<(), SessionError> {
        let had = self.tx.send_replace(None).is_some();
        if had {
            info!("session cleared");
        }
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.tx.subscribe()
    }
}
