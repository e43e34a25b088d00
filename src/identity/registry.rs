use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::PLAYER_ID_HEX_LEN;
use crate::error::{AppError, Result};
use crate::types::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: PlayerId,
    /// Raw handle as first seen at the table.
    pub original_handle: String,
    /// Operator-assigned display name.
    pub alias: Option<String>,
}

impl PlayerIdentity {
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.original_handle)
    }
}

/// One entry of a batch alias assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasAssignment {
    pub id: PlayerId,
    pub alias: String,
}

/// Content-derived id: leading hex of SHA-256 over the handle (plus a salt on collision).
fn derive_id(handle: &str, salt: u32) -> PlayerId {
    let mut hasher = Sha256::new();
    hasher.update(handle.as_bytes());
    if salt > 0 {
        hasher.update(salt.to_le_bytes());
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(PLAYER_ID_HEX_LEN);
    hex
}

/// Canonical player store. Identities are created on first sight of a handle and never
/// deleted; ids never change, only aliases do.
#[derive(Default)]
pub struct IdentityRegistry {
    /// id → identity
    players: DashMap<PlayerId, PlayerIdentity>,
    /// raw handle → id
    handles: DashMap<String, PlayerId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity for a raw handle, created on first sight. The same handle always yields
    /// the same id.
    pub fn resolve(&self, handle: &str) -> PlayerIdentity {
        if let Some(id) = self.handles.get(handle) {
            if let Some(identity) = self.players.get(id.value()) {
                return identity.clone();
            }
        }

        let mut salt = 0u32;
        loop {
            let id = derive_id(handle, salt);
            let identity = self
                .players
                .entry(id.clone())
                .or_insert_with(|| {
                    debug!(player_id = %id, handle, "new player identity");
                    PlayerIdentity {
                        id: id.clone(),
                        original_handle: handle.to_string(),
                        alias: None,
                    }
                })
                .clone();
            if identity.original_handle == handle {
                self.handles.insert(handle.to_string(), id);
                return identity;
            }
            warn!(
                player_id = %id,
                handle,
                other = %identity.original_handle,
                "player id collision"
            );
            salt += 1;
        }
    }

    pub fn get(&self, id: &str) -> Option<PlayerIdentity> {
        self.players.get(id).map(|p| p.clone())
    }

    pub fn display_name(&self, id: &str) -> Option<String> {
        self.players.get(id).map(|p| p.display_name().to_string())
    }

    /// Overwrite the alias for `id`. A blank alias clears it.
    pub fn set_alias(&self, id: &str, alias: &str) -> Result<()> {
        let mut entry = self
            .players
            .get_mut(id)
            .ok_or_else(|| AppError::UnknownPlayer { id: id.to_string() })?;
        let alias = alias.trim();
        entry.alias = (!alias.is_empty()).then(|| alias.to_string());
        info!(player_id = %id, alias, "alias updated");
        Ok(())
    }

    /// Apply several aliases at once. Every id is checked before any alias changes.
    pub fn set_aliases(&self, assignments: &[AliasAssignment]) -> Result<usize> {
        let missing = assignments
            .iter()
            .find(|a| !self.players.contains_key(&a.id));
        if let Some(missing) = missing {
            return Err(AppError::UnknownPlayer {
                id: missing.id.clone(),
            });
        }
        for a in assignments {
            self.set_alias(&a.id, &a.alias)?;
        }
        Ok(assignments.len())
    }

    /// Every identity, ordered by original handle.
    pub fn list(&self) -> Vec<PlayerIdentity> {
        let mut all: Vec<PlayerIdentity> = self.players.iter().map(|p| p.value().clone()).collect();
        all.sort_by(|a, b| {
            a.original_handle
                .cmp(&b.original_handle)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    /// Restore persisted identities, keeping their stored ids.
    pub fn load(&self, identities: impl IntoIterator<Item = PlayerIdentity>) {
        for identity in identities {
            self.handles.insert(identity.original_handle.clone(), identity.id.clone());
            self.players.insert(identity.id.clone(), identity);
        }
    }

    pub fn clear(&self) {
        self.players.clear();
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_handle_same_id() {
        let registry = IdentityRegistry::new();
        let a = registry.resolve("Alice99");
        let b = registry.resolve("Alice99");
        assert_eq!(a, b);
        assert_eq!(a.id.len(), PLAYER_ID_HEX_LEN);
        assert_eq!(registry.len(), 1);

        // Stable across registries (and therefore across runs).
        let other = IdentityRegistry::new();
        assert_eq!(other.resolve("Alice99").id, a.id);
        assert_ne!(other.resolve("alice99").id, a.id);
    }

    #[test]
    fn alias_changes_display_name_not_id() {
        let registry = IdentityRegistry::new();
        let id = registry.resolve("Bob_2341").id;
        registry.set_alias(&id, "Bob").unwrap();

        let again = registry.resolve("Bob_2341");
        assert_eq!(again.id, id);
        assert_eq!(again.original_handle, "Bob_2341");
        assert_eq!(again.display_name(), "Bob");

        registry.set_alias(&id, "  ").unwrap();
        assert_eq!(registry.display_name(&id).unwrap(), "Bob_2341");
    }

    #[test]
    fn unknown_player_alias_is_rejected() {
        let registry = IdentityRegistry::new();
        let err = registry.set_alias("deadbeef", "X").unwrap_err();
        assert!(matches!(err, AppError::UnknownPlayer { ref id } if id == "deadbeef"));
        assert!(registry.is_empty());
    }

    #[test]
    fn batch_alias_is_all_or_nothing() {
        let alias = |id: &str, alias: &str| AliasAssignment {
            id: id.to_string(),
            alias: alias.to_string(),
        };
        let registry = IdentityRegistry::new();
        let a = registry.resolve("a").id;
        let b = registry.resolve("b").id;

        let bad = vec![alias(&a, "X"), alias("missing", "X")];
        assert!(registry.set_aliases(&bad).is_err());
        assert_eq!(registry.get(&a).unwrap().alias, None);

        let good = vec![alias(&a, "X"), alias(&b, "X")];
        assert_eq!(registry.set_aliases(&good).unwrap(), 2);
        assert_eq!(registry.display_name(&a), registry.display_name(&b));
        assert_ne!(a, b, "merging never collapses ids");
    }

    #[test]
    fn load_round_trips_through_list() {
        let registry = IdentityRegistry::new();
        let id = registry.resolve("Carl").id;
        registry.set_alias(&id, "C").unwrap();
        registry.resolve("Ann");

        let restored = IdentityRegistry::new();
        restored.load(registry.list());
        assert_eq!(restored.list(), registry.list());
        assert_eq!(restored.resolve("Carl").alias.as_deref(), Some("C"));
        assert_eq!(restored.list()[0].original_handle, "Ann");
    }
}
