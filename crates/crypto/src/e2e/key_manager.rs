//! Raum-Schluessel-Verwaltung (Key Manager)
//!
//! Haelt pro Raum den aktuellen Schluessel als `Arc<RoomKeyEpoch>`:
//! - Ableitung bei Raum-Erstellung und bei jeder Mitgliedschaftsaenderung
//! - Atomarer Austausch: laufende Operationen behalten ihren `Arc` und
//!   arbeiten mit der Epoch weiter, mit der sie begonnen haben
//! - Optional: die letzten N abgeloesten Schluessel fuer die History
//! - Entfernen beim Schliessen des Raums

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::e2e::room_key::{canonical_snapshot, derive_room_key, RoomKey};
use crate::error::{CryptoError, CryptoResult};
use crate::types::MemberPublicKey;

/// Ein Raum-Schluessel zusammen mit seiner Epoch und dem Snapshot
#[derive(Debug)]
pub struct RoomKeyEpoch {
    /// Zaehlt ab 0, +1 pro tatsaechlicher Mitgliedschaftsaenderung
    pub epoch: u32,
    pub key: RoomKey,
    /// Sortierter, deduplizierter Mitglieder-Snapshot
    pub members: Vec<MemberPublicKey>,
}

#[derive(Debug)]
struct RoomState {
    current: Arc<RoomKeyEpoch>,
    /// Abgeloeste Schluessel, neuester zuerst
    retained: VecDeque<Arc<RoomKeyEpoch>>,
}

/// Verwaltet Raum-Schluessel fuer alle Raeume einer Sitzung
#[derive(Debug, Default)]
pub struct RoomKeyManager {
    rooms: DashMap<String, RoomState>,
    retained_epochs: usize,
}

impl RoomKeyManager {
    /// Verwirft abgeloeste Schluessel sofort
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaelt bis zu `retained_epochs` abgeloeste Schluessel pro Raum
    pub fn with_retention(retained_epochs: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            retained_epochs,
        }
    }

    /// Setzt die Mitgliedschaft eines Raums und leitet bei Bedarf neu ab
    ///
    /// Ein unveraenderter Snapshot liefert die bestehende Epoch zurueck.
    pub fn update_membership(
        &self,
        room_id: &str,
        member_keys: &[MemberPublicKey],
    ) -> CryptoResult<Arc<RoomKeyEpoch>> {
        let members = canonical_snapshot(member_keys);

        if let Some(state) = self.rooms.get(room_id) {
            if state.current.members == members {
                return Ok(Arc::clone(&state.current));
            }
        }

        // Ableitung ausserhalb des Shard-Locks
        let key = derive_room_key(room_id, &members)?;

        match self.rooms.entry(room_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                if state.current.members == members {
                    return Ok(Arc::clone(&state.current));
                }
                let next = Arc::new(RoomKeyEpoch {
                    epoch: state.current.epoch + 1,
                    key,
                    members,
                });
                let previous = std::mem::replace(&mut state.current, Arc::clone(&next));
                if self.retained_epochs > 0 {
                    state.retained.push_front(previous);
                    state.retained.truncate(self.retained_epochs);
                }

                tracing::info!(
                    room_id = room_id,
                    epoch = next.epoch,
                    mitglieder = next.members.len(),
                    "Raum-Schluessel rotiert"
                );
                Ok(next)
            }
            Entry::Vacant(entry) => {
                let first = Arc::new(RoomKeyEpoch {
                    epoch: 0,
                    key,
                    members,
                });
                entry.insert(RoomState {
                    current: Arc::clone(&first),
                    retained: VecDeque::new(),
                });

                tracing::info!(
                    room_id = room_id,
                    mitglieder = first.members.len(),
                    "Raum-Schluessel erstellt"
                );
                Ok(first)
            }
        }
    }

    /// Gibt den aktuellen Schluessel eines Raums zurueck
    pub fn current_key(&self, room_id: &str) -> CryptoResult<Arc<RoomKeyEpoch>> {
        self.rooms
            .get(room_id)
            .map(|state| Arc::clone(&state.current))
            .ok_or_else(|| CryptoError::KeinSchluessel {
                room_id: room_id.to_string(),
            })
    }

    /// Abgeloeste, noch behaltene Schluessel (neuester zuerst)
    pub fn retained_keys(&self, room_id: &str) -> Vec<Arc<RoomKeyEpoch>> {
        self.rooms
            .get(room_id)
            .map(|state| state.retained.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Sucht den Schluessel einer bestimmten Epoch (aktuell oder behalten)
    pub fn key_for_epoch(&self, room_id: &str, epoch: u32) -> Option<Arc<RoomKeyEpoch>> {
        let state = self.rooms.get(room_id)?;
        if state.current.epoch == epoch {
            return Some(Arc::clone(&state.current));
        }
        state.retained.iter().find(|k| k.epoch == epoch).cloned()
    }

    /// Gibt die aktuelle Epoch eines Raums zurueck
    pub fn current_epoch(&self, room_id: &str) -> CryptoResult<u32> {
        Ok(self.current_key(room_id)?.epoch)
    }

    /// Verwirft alle Schluessel eines Raums. `true` wenn der Raum bekannt war.
    pub fn close_room(&self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            tracing::info!(room_id = room_id, "Raum-Schluessel verworfen");
        }
        removed
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityKeyring;

    fn mitglied() -> MemberPublicKey {
        IdentityKeyring::initialize().unwrap().public_key().clone()
    }

    #[test]
    fn raum_erstellen() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let key = manager.update_membership("AB12C9", &[pa]).unwrap();
        assert_eq!(key.epoch, 0);
        assert_eq!(key.members.len(), 1);
        assert_eq!(key.key.room_id(), "AB12C9");
    }

    #[test]
    fn fehlender_raum_ergibt_fehler() {
        let manager = RoomKeyManager::new();
        let result = manager.current_key("nicht-vorhanden");
        assert!(matches!(result, Err(CryptoError::KeinSchluessel { .. })));
    }

    #[test]
    fn beitritt_rotiert_schluessel() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let pb = mitglied();

        let k1 = manager.update_membership("AB12C9", &[pa.clone()]).unwrap();
        let k2 = manager.update_membership("AB12C9", &[pa, pb]).unwrap();

        assert_eq!(k2.epoch, 1);
        assert_ne!(k1.key.as_bytes(), k2.key.as_bytes());
        assert_eq!(manager.current_epoch("AB12C9").unwrap(), 1);
    }

    #[test]
    fn gleicher_snapshot_ist_idempotent() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let pb = mitglied();

        let k1 = manager
            .update_membership("AB12C9", &[pa.clone(), pb.clone()])
            .unwrap();
        let k2 = manager.update_membership("AB12C9", &[pb, pa]).unwrap();

        assert!(Arc::ptr_eq(&k1, &k2));
        assert_eq!(manager.current_epoch("AB12C9").unwrap(), 0);
    }

    #[test]
    fn austritt_rotiert_ebenfalls() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let pb = mitglied();
        manager
            .update_membership("AB12C9", &[pa.clone(), pb])
            .unwrap();
        let nach_austritt = manager.update_membership("AB12C9", &[pa]).unwrap();
        assert_eq!(nach_austritt.epoch, 1);
        assert_eq!(nach_austritt.members.len(), 1);
    }

    #[test]
    fn leere_mitgliedschaft_aendert_nichts() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        manager.update_membership("AB12C9", &[pa]).unwrap();

        let result = manager.update_membership("AB12C9", &[]);
        assert!(matches!(result, Err(CryptoError::InvalidMembership(_))));
        assert_eq!(manager.current_epoch("AB12C9").unwrap(), 0);
    }

    #[test]
    fn alter_arc_bleibt_gueltig() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let laufend = manager.update_membership("AB12C9", &[pa.clone()]).unwrap();
        let alte_bytes = *laufend.key.as_bytes();

        manager.update_membership("AB12C9", &[pa, mitglied()]).unwrap();
        // Die laufende Operation sieht weiterhin ihren Schluessel
        assert_eq!(laufend.key.as_bytes(), &alte_bytes);
        assert_eq!(laufend.epoch, 0);
    }

    #[test]
    fn ohne_retention_keine_alten_schluessel() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        manager.update_membership("AB12C9", &[pa.clone()]).unwrap();
        manager.update_membership("AB12C9", &[pa, mitglied()]).unwrap();
        assert!(manager.retained_keys("AB12C9").is_empty());
        assert!(manager.key_for_epoch("AB12C9", 0).is_none());
    }

    #[test]
    fn retention_ist_begrenzt() {
        let manager = RoomKeyManager::with_retention(2);
        let pa = mitglied();
        let mut members = vec![pa];
        manager.update_membership("AB12C9", &members).unwrap();
        for _ in 0..3 {
            members.push(mitglied());
            manager.update_membership("AB12C9", &members).unwrap();
        }

        let retained = manager.retained_keys("AB12C9");
        assert_eq!(retained.len(), 2);
        assert_eq!(retained[0].epoch, 2);
        assert_eq!(retained[1].epoch, 1);
        assert!(manager.key_for_epoch("AB12C9", 3).is_some());
        assert!(manager.key_for_epoch("AB12C9", 0).is_none());
    }

    #[test]
    fn raum_schliessen() {
        let manager = RoomKeyManager::new();
        manager.update_membership("AB12C9", &[mitglied()]).unwrap();
        assert_eq!(manager.room_count(), 1);
        assert!(manager.close_room("AB12C9"));
        assert!(!manager.close_room("AB12C9"));
        assert!(manager.current_key("AB12C9").is_err());
    }

    #[test]
    fn raeume_sind_unabhaengig() {
        let manager = RoomKeyManager::new();
        let pa = mitglied();
        let a = manager.update_membership("RAUM-A", &[pa.clone()]).unwrap();
        let b = manager.update_membership("RAUM-B", &[pa]).unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
        assert_eq!(manager.room_count(), 2);
    }
}
