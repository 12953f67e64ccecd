//! Named logical connections.
//!
//! Profiles are registered up front; live handles are opened lazily through the
//! [`Connector`] on first use of a name and kept until [`ConnectionRegistry::disconnect`].
//! Exactly one name is active at a time; builders capture the active handle when they are
//! created, so switching afterwards never affects a query under construction.

use crate::client::{Connection, Connector};
use crate::config::{ConnectionProfile, DEFAULT_CONNECTION};
use crate::dialect::Dialect;
use crate::error::{QuarryError, QuarryResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A resolved live connection: its name, dialect and driver handle.
#[derive(Clone)]
pub struct ConnectionHandle {
    name: String,
    dialect: Dialect,
    connection: Arc<dyn Connection>,
}

impl ConnectionHandle {
    pub fn new(name: impl Into<String>, dialect: Dialect, connection: Arc<dyn Connection>) -> Self {
        Self {
            name: name.into(),
            dialect,
            connection,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

/// Registry of connection profiles and their live handles.
pub struct ConnectionRegistry {
    connector: Arc<dyn Connector>,
    profiles: RwLock<HashMap<String, ConnectionProfile>>,
    handles: tokio::sync::Mutex<HashMap<String, ConnectionHandle>>,
    active: RwLock<String>,
}

impl ConnectionRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            profiles: RwLock::new(HashMap::new()),
            handles: tokio::sync::Mutex::new(HashMap::new()),
            active: RwLock::new(DEFAULT_CONNECTION.to_string()),
        }
    }

    /// Store a profile under `name` without connecting.
    ///
    /// A profile cannot be replaced while its connection is open.
    pub async fn add_connection(
        &self,
        name: impl Into<String>,
        profile: ConnectionProfile,
    ) -> QuarryResult<()> {
        let name = name.into();
        if self.handles.lock().await.contains_key(&name) {
            return Err(QuarryError::connection(format!(
                "Connection '{name}' is open; disconnect it before replacing its settings"
            )));
        }
        tracing::debug!(connection = %name, driver = %profile.driver, "connection added");
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, profile);
        Ok(())
    }

    /// Store a profile before any handle can exist (used while building a `Database`).
    pub(crate) fn insert_profile(&self, name: impl Into<String>, profile: ConnectionProfile) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), profile);
    }

    /// Open (or reuse) the live handle for `name`.
    ///
    /// The handle map is not locked while the connector runs, so opening one name never
    /// blocks queries on names that are already open.
    pub async fn connect(&self, name: &str) -> QuarryResult<ConnectionHandle> {
        if let Some(handle) = self.handles.lock().await.get(name) {
            return Ok(handle.clone());
        }

        let profile = self
            .profile(name)
            .ok_or_else(|| QuarryError::UnknownConnection(name.to_string()))?;
        let connection_string = profile.connection_string()?;
        let connection = self
            .connector
            .connect(&profile, &connection_string)
            .await
            .map_err(|e| match e {
                QuarryError::Connection(_) => e,
                other => QuarryError::connection(format!(
                    "Failed to connect '{name}' ({}): {other}",
                    profile.driver
                )),
            })?;

        let mut handles = self.handles.lock().await;
        if let Some(existing) = handles.get(name).cloned() {
            // Another caller opened the same name first; keep theirs.
            drop(handles);
            if let Err(e) = connection.close().await {
                tracing::debug!(connection = %name, error = %e, "closing duplicate handle failed");
            }
            return Ok(existing);
        }

        tracing::info!(connection = %name, driver = %profile.driver, "connected");
        let handle = ConnectionHandle::new(name, profile.driver, connection);
        handles.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Make `name` the active connection.
    pub fn set_active(&self, name: &str) -> QuarryResult<()> {
        if !self.contains(name) {
            return Err(QuarryError::UnknownConnection(name.to_string()));
        }
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = name.to_string();
        Ok(())
    }

    /// Name of the active connection.
    pub fn active_name(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Live handle for the active connection, opened if needed.
    pub async fn active(&self) -> QuarryResult<ConnectionHandle> {
        let name = self.active_name();
        self.connect(&name).await
    }

    /// Close the handle for `name`.
    ///
    /// If `name` was active, the active name falls back to `default`. With `remove`, the
    /// profile is forgotten too. A failing `close` is returned after the teardown is done.
    pub async fn disconnect(&self, name: &str, remove: bool) -> QuarryResult<()> {
        if !self.contains(name) {
            return Err(QuarryError::UnknownConnection(name.to_string()));
        }

        let handle = self.handles.lock().await.remove(name);
        let closed = match handle {
            Some(handle) => handle.connection.close().await,
            None => Ok(()),
        };
        match &closed {
            Ok(()) => tracing::info!(connection = %name, "disconnected"),
            Err(e) => tracing::warn!(connection = %name, error = %e, "close failed"),
        }

        {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            if *active == name {
                *active = DEFAULT_CONNECTION.to_string();
            }
        }

        if remove {
            self.profiles
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(name);
        }
        closed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn profile(&self, name: &str) -> Option<ConnectionProfile> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether a live handle is currently open for `name`.
    pub async fn is_connected(&self, name: &str) -> bool {
        self.handles.lock().await.contains_key(name)
    }

    /// Registered connection names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .field("active", &self.active_name())
            .finish_non_exhaustive()
    }
}
