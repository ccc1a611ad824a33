//! Edit journal
//!
//! Append-only record of what a session did, chained by SHA-256 so that a
//! modified or removed entry is detected by [`EditJournal::verify_integrity`].
//! The journal is an audit trail; the session never reads it back.

use crate::error::JournalError;
use crate::types::{EditSequence, SessionId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// What happened to an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalAction {
    /// Edit executed for the first time
    Executed,
    /// Edit undone
    Undone,
    /// Undone edit executed again
    Redone,
    /// Edit corrected by an update
    Corrected,
    /// Rollforward recomputed dependent edits
    RolledForward,
    /// Rollforward stopped at an edit it could not recompute
    RollforwardHalted,
}

impl JournalAction {
    fn as_u8(self) -> u8 {
        match self {
            Self::Executed => 0,
            Self::Undone => 1,
            Self::Redone => 2,
            Self::Corrected => 3,
            Self::RolledForward => 4,
            Self::RollforwardHalted => 5,
        }
    }
}

/// One journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal
    pub index: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Session that wrote the entry
    pub session: SessionId,
    /// What happened
    pub action: JournalAction,
    /// Edit concerned
    pub sequence: EditSequence,
    /// Free-form detail
    pub detail: String,
    /// Hash of the previous entry
    pub prev_hash: [u8; 32],
    /// Hash of this entry
    pub hash: [u8; 32],
}

/// Hash-chained journal
#[derive(Debug, Clone)]
pub struct EditJournal {
    session: SessionId,
    enabled: bool,
    entries: Vec<JournalEntry>,
}

impl EditJournal {
    /// Create an empty journal
    #[must_use]
    pub fn new(session: SessionId, enabled: bool) -> Self {
        Self {
            session,
            enabled,
            entries: Vec::new(),
        }
    }

    /// Is the journal recording?
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append an entry; does nothing when disabled
    pub fn append(
        &mut self,
        action: JournalAction,
        sequence: EditSequence,
        detail: impl Into<String>,
    ) {
        if !self.enabled {
            return;
        }
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let mut entry = JournalEntry {
            index: self.entries.len() as u64,
            timestamp,
            session: self.session,
            action,
            sequence,
            detail: detail.into(),
            prev_hash: self.entries.last().map_or([0u8; 32], |e| e.hash),
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);
        self.entries.push(entry);
    }

    /// All entries, oldest first
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the journal empty?
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex hash of the latest entry
    #[must_use]
    pub fn head_hex(&self) -> Option<String> {
        self.entries.last().map(|e| hex::encode(e.hash))
    }

    /// Check the hash chain
    ///
    /// # Errors
    /// Returns the index of the first entry that does not chain
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        let mut prev = [0u8; 32];
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.prev_hash != prev || entry.hash != compute_hash(entry) {
                return Err(JournalError::IntegrityViolation { index });
            }
            prev = entry.hash;
        }
        Ok(())
    }
}

fn compute_hash(entry: &JournalEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.index.to_le_bytes());
    hasher.update(entry.timestamp.to_le_bytes());
    hasher.update(entry.session.0.as_bytes());
    hasher.update([entry.action.as_u8()]);
    hasher.update(entry.sequence.0.to_le_bytes());
    hasher.update(entry.detail.as_bytes());
    hasher.update([0]);
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> EditJournal {
        let mut j = EditJournal::new(SessionId::new(), true);
        j.append(JournalAction::Executed, EditSequence(1), "New point");
        j.append(JournalAction::Executed, EditSequence(2), "Sideshot");
        j.append(JournalAction::Undone, EditSequence(2), "Sideshot");
        j
    }

    #[test]
    fn chain_verifies() {
        let j = journal();
        assert_eq!(j.len(), 3);
        assert!(j.verify_integrity().is_ok());
        assert_eq!(j.entries()[1].prev_hash, j.entries()[0].hash);
        assert_eq!(j.head_hex().unwrap().len(), 64);
    }

    #[test]
    fn tampering_is_detected() {
        let mut j = journal();
        j.entries[1].detail = "Something else".into();
        assert_eq!(
            j.verify_integrity(),
            Err(JournalError::IntegrityViolation { index: 1 })
        );

        let mut j = journal();
        j.entries.remove(0);
        assert_eq!(
            j.verify_integrity(),
            Err(JournalError::IntegrityViolation { index: 0 })
        );
    }

    #[test]
    fn disabled_journal_records_nothing() {
        let mut j = EditJournal::new(SessionId::new(), false);
        j.append(JournalAction::Executed, EditSequence(1), "New point");
        assert!(j.is_empty());
        assert!(j.head_hex().is_none());
        assert!(j.verify_integrity().is_ok());
    }
}
