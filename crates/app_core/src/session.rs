//! Reference sessions offered to the board

use crate::config::SessionConfig;
use serde::Serialize;

/// Catalog entry shown when picking a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub name: String,
    pub reference_count: usize,
}

/// Read-only source of reference lists
pub trait SessionCatalog: Send + Sync {
    fn sessions(&self) -> Vec<SessionInfo>;

    /// Reference texts of a session, `None` for an unknown id
    fn references(&self, id: &str) -> Option<Vec<String>>;

    fn name(&self, id: &str) -> Option<String> {
        self.sessions().into_iter().find(|s| s.id == id).map(|s| s.name)
    }
}

/// Catalog built from the `[[sessions]]` config entries
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    sessions: Vec<SessionConfig>,
}

impl StaticCatalog {
    pub fn new(sessions: Vec<SessionConfig>) -> Self {
        Self { sessions }
    }

    pub fn from_config(config: &crate::AppConfig) -> Self {
        Self::new(config.sessions.clone())
    }

    fn find(&self, id: &str) -> Option<&SessionConfig> {
        self.sessions.iter().find(|s| s.id == id)
    }
}

impl SessionCatalog for StaticCatalog {
    fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|s| SessionInfo {
                id: s.id.clone(),
                name: s.name.clone(),
                reference_count: s.references.len(),
            })
            .collect()
    }

    fn references(&self, id: &str) -> Option<Vec<String>> {
        self.find(id).map(|s| s.references.clone())
    }

    fn name(&self, id: &str) -> Option<String> {
        self.find(id).map(|s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    #[test]
    fn test_default_catalog() {
        let catalog = StaticCatalog::from_config(&AppConfig::default());
        let sessions = catalog.sessions();

        assert_eq!(sessions.len(), 5);
        assert_eq!(sessions[0].id, "session_proj_alpha");
        assert_eq!(sessions[0].reference_count, 5);
        assert_eq!(
            catalog.references("session_dev_sprint_5").unwrap()[0],
            "FEAT-101"
        );
        assert_eq!(
            catalog.name("session_client_beta").as_deref(),
            Some("Client Beta - Approved Product Names")
        );
        assert!(catalog.references("nope").is_none());
    }
}
