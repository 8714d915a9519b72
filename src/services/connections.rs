use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ApiConnection;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// Probes whether a registered connection is reachable. The bundled
/// simulated tester stands in for a real round trip to the endpoint.
#[async_trait]
pub trait ConnectionTester: Send + Sync {
    async fn test(&self, connection: &ApiConnection) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct SimulatedTester {
    latency: Duration,
}

impl SimulatedTester {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedTester {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

#[async_trait]
impl ConnectionTester for SimulatedTester {
    async fn test(&self, _connection: &ApiConnection) -> Result<(), String> {
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// The settings screen's list of external API connections. Entirely
/// separate from the conversation state.
#[derive(Clone)]
pub struct ApiConnectionRegistry {
    connections: Arc<Mutex<Vec<ApiConnection>>>,
    tester: Arc<dyn ConnectionTester>,
}

impl ApiConnectionRegistry {
    pub fn new(tester: Arc<dyn ConnectionTester>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(Vec::new())),
            tester,
        }
    }

    /// Register a connection. Name and endpoint are required; new
    /// connections start inactive until the user enables them.
    pub fn add(
        &self,
        name: &str,
        kind: &str,
        endpoint: &str,
        api_key: Option<&str>,
    ) -> Result<ApiConnection, RegistryError> {
        let name = name.trim();
        let endpoint = endpoint.trim();
        if name.is_empty() {
            return Err(RegistryError::MissingField("name"));
        }
        if endpoint.is_empty() {
            return Err(RegistryError::MissingField("endpoint"));
        }

        let connection = ApiConnection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind: kind.trim().to_string(),
            endpoint: endpoint.to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            is_active: false,
            created_at: Utc::now(),
        };

        self.connections.lock().unwrap().push(connection.clone());
        tracing::debug!(connection = %connection.id, name = %connection.name, "registered API connection");
        Ok(connection)
    }

    pub fn delete(&self, id: &str) -> Result<ApiConnection, RegistryError> {
        let mut connections = self.connections.lock().unwrap();
        let index = connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(connections.remove(index))
    }

    /// Flip the active flag; returns the new state.
    pub fn toggle_active(&self, id: &str) -> Result<bool, RegistryError> {
        let mut connections = self.connections.lock().unwrap();
        let connection = connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        connection.is_active = !connection.is_active;
        Ok(connection.is_active)
    }

    pub fn get(&self, id: &str) -> Option<ApiConnection> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn list(&self) -> Vec<ApiConnection> {
        self.connections.lock().unwrap().clone()
    }

    pub async fn test(&self, id: &str) -> Result<Result<(), String>, RegistryError> {
        let connection = self
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(self.tester.test(&connection).await)
    }
}
