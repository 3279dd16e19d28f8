//! Declaration Storage Implementations
//!
//! Read-side access to agents and their trust declarations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use trustgrid_common::{Agent, ScoringError, TrustDeclaration, VerificationStatus};

/// Trait for declaration storage backends
#[async_trait]
pub trait DeclarationStore: Send + Sync {
    /// Get an agent by ID
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, StoreError>;

    /// Get all declarations for an agent, any status
    async fn declarations(&self, agent_id: &str) -> Result<Vec<TrustDeclaration>, StoreError>;

    /// Get only verified declarations for an agent
    async fn verified_declarations(
        &self,
        agent_id: &str,
    ) -> Result<Vec<TrustDeclaration>, StoreError> {
        Ok(self
            .declarations(agent_id)
            .await?
            .into_iter()
            .filter(|d| d.is_verified())
            .collect())
    }
}

/// Errors from declaration store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Declaration not found: {0}")]
    DeclarationNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<StoreError> for ScoringError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AgentNotFound(id) => ScoringError::AgentNotFound(id),
            other => ScoringError::Store(other.to_string()),
        }
    }
}

/// In-memory storage implementation
///
/// Uses DashMap for concurrent access.
#[derive(Default)]
pub struct InMemoryDeclarationStore {
    /// Agents by ID
    agents: DashMap<String, Agent>,

    /// Declarations by agent ID
    by_agent: DashMap<String, Vec<TrustDeclaration>>,
}

impl InMemoryDeclarationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an agent
    pub fn upsert_agent(&self, agent: Agent) {
        self.agents.insert(agent.id.clone(), agent);
    }

    /// Add a declaration for a known agent
    pub fn add_declaration(&self, declaration: TrustDeclaration) -> Result<(), StoreError> {
        if !self.agents.contains_key(&declaration.agent_id) {
            return Err(StoreError::AgentNotFound(declaration.agent_id));
        }
        self.by_agent
            .entry(declaration.agent_id.clone())
            .or_default()
            .push(declaration);
        Ok(())
    }

    /// Move a declaration through its verification lifecycle
    pub fn update_status(
        &self,
        agent_id: &str,
        declaration_id: &str,
        status: VerificationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), ScoringError> {
        let mut declarations = self
            .by_agent
            .get_mut(agent_id)
            .ok_or_else(|| StoreError::AgentNotFound(agent_id.to_string()))?;

        let declaration = declarations
            .iter_mut()
            .find(|d| d.id == declaration_id)
            .ok_or_else(|| StoreError::DeclarationNotFound(declaration_id.to_string()))?;

        declaration.transition(status, at)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[async_trait]
impl DeclarationStore for InMemoryDeclarationStore {
    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, StoreError> {
        Ok(self.agents.get(agent_id).map(|a| a.clone()))
    }

    async fn declarations(&self, agent_id: &str) -> Result<Vec<TrustDeclaration>, StoreError> {
        Ok(self
            .by_agent
            .get(agent_id)
            .map(|d| d.clone())
            .unwrap_or_default())
    }
}
