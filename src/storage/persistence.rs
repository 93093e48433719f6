//! Journal and snapshot persistence layer for the document store

use crate::core::{Document, Result, StoreError};
use crate::storage::memory::DocumentMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{Level, event};

pub const JOURNAL_FILE: &str = "taskstore.journal";
pub const SNAPSHOT_FILE: &str = "taskstore.snapshot";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
/// Little-endian `u32` body length in front of every journal entry.
const FRAME_HEADER_LEN: u64 = 4;

// ============================================================================
// Journal Entry Types
// ============================================================================

/// Journal entry types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalEntry {
    /// A document write, already stamped with its new revision.
    Put { doc: Document },
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub documents: DocumentMap,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at_unix_ms: i64,
    pub doc_count: usize,
}

impl StoreSnapshot {
    pub fn new(documents: DocumentMap) -> Self {
        let doc_count = documents.len();
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            documents,
            metadata: SnapshotMetadata {
                created_at_unix_ms: Utc::now().timestamp_millis(),
                doc_count,
            },
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every journal append
    Sync,
    /// flush to the OS, no fsync
    #[default]
    Async,
    /// nothing is written to disk
    None,
}

impl FromStr for DurabilityMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "none" => Ok(Self::None),
            other => Err(StoreError::Config(format!(
                "unknown durability mode '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Journal Manager
// ============================================================================

/// Result of scanning the journal file.
#[derive(Debug, Default)]
pub struct JournalReplay {
    pub entries: Vec<JournalEntry>,
    /// Byte length of the complete entries at the start of the file.
    pub valid_len: u64,
    /// Trailing bytes of an append that never finished.
    pub torn_bytes: u64,
}

pub struct JournalManager {
    journal_path: PathBuf,
    journal_file: Option<BufWriter<File>>,
    durability_mode: DurabilityMode,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
}

impl JournalManager {
    pub fn new<P: AsRef<Path>>(journal_path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let journal_path = journal_path.as_ref().to_path_buf();
        if let Some(parent) = journal_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let journal_file = if durability_mode != DurabilityMode::None {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&journal_path)?;
            Some(BufWriter::new(file))
        } else {
            None
        };

        Ok(Self {
            journal_path,
            journal_file,
            durability_mode,
            entries_since_checkpoint: 0,
            checkpoint_threshold: 1000,
        })
    }

    /// Append one length-prefixed entry. The prefix and body go out in a
    /// single write so a crash can only tear the final frame.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        let Some(writer) = self.journal_file.as_mut() else {
            return Ok(());
        };
        let body = rmp_serde::to_vec(entry)?;
        let len = u32::try_from(body.len()).map_err(|_| {
            StoreError::Serialization(format!("journal entry of {} bytes is too large", body.len()))
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN as usize + body.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&body);
        writer.write_all(&frame)?;
        writer.flush()?;
        if self.durability_mode == DurabilityMode::Sync {
            writer.get_ref().sync_data()?;
        }
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    /// Reads every complete entry and reports where the last one ends.
    ///
    /// A process killed mid-append leaves a partial length prefix or body at
    /// the end of the file. Those bytes are counted in `torn_bytes` instead of
    /// being treated as corruption.
    pub fn read_all(&self) -> Result<JournalReplay> {
        if !self.journal_path.exists() {
            return Ok(JournalReplay::default());
        }
        let file = File::open(&self.journal_path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut replay = JournalReplay::default();

        while replay.valid_len + FRAME_HEADER_LEN <= file_len {
            let mut len_bytes = [0u8; 4];
            reader.read_exact(&mut len_bytes)?;
            let len = u64::from(u32::from_le_bytes(len_bytes));
            if replay.valid_len + FRAME_HEADER_LEN + len > file_len {
                break;
            }
            let mut data = vec![0u8; len as usize];
            reader.read_exact(&mut data)?;
            replay.entries.push(rmp_serde::from_slice(&data)?);
            replay.valid_len += FRAME_HEADER_LEN + len;
        }

        replay.torn_bytes = file_len - replay.valid_len;
        Ok(replay)
    }

    /// Empty the journal after its entries were folded into a snapshot.
    pub fn clear(&mut self) -> Result<()> {
        self.truncate_to(0)?;
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    /// Cut the file back to `len` bytes and sync it. The writer appends, so
    /// the next entry lands right after the cut.
    fn truncate_to(&mut self, len: u64) -> Result<()> {
        let Some(writer) = self.journal_file.as_mut() else {
            return Ok(());
        };
        writer.flush()?;
        let file = writer.get_mut();
        file.set_len(len)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold;
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    /// Writes the snapshot to a temp file in the same directory, syncs it and
    /// renames it over the previous snapshot.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let dir = self
            .snapshot_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let serialized = rmp_serde::to_vec(snapshot)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&serialized)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| StoreError::IoError(format!("failed to persist snapshot: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.snapshot_path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version > SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::Serialization(format!(
                "snapshot format {} is newer than supported format {}",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    journal: JournalManager,
    snapshot: SnapshotManager,
    durability_mode: DurabilityMode,
}

impl PersistenceManager {
    pub fn new<P: AsRef<Path>>(data_dir: P, durability_mode: DurabilityMode) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let journal = JournalManager::new(data_dir.join(JOURNAL_FILE), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(SNAPSHOT_FILE));
        Ok(Self {
            journal,
            snapshot,
            durability_mode,
        })
    }

    pub fn log(&mut self, entry: &JournalEntry) -> Result<()> {
        self.journal.append(entry)
    }

    pub fn checkpoint(&mut self, documents: &DocumentMap) -> Result<()> {
        if self.durability_mode == DurabilityMode::None {
            return Ok(());
        }
        self.snapshot.save(&StoreSnapshot::new(documents.clone()))?;
        self.journal.clear()?;
        event!(Level::DEBUG, doc_count = documents.len(), "checkpoint written");
        Ok(())
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.journal.needs_checkpoint()
    }

    /// Rebuilds the document map from the last snapshot plus the journal.
    ///
    /// A torn tail is cut off the journal before anything else is appended,
    /// otherwise its dangling length prefix would swallow the next entries.
    pub fn recover(&mut self) -> Result<DocumentMap> {
        let mut documents = match self.snapshot.load()? {
            Some(snapshot) => snapshot.documents,
            None => DocumentMap::new(),
        };

        let replay = self.journal.read_all()?;
        if replay.torn_bytes > 0 {
            event!(
                Level::WARN,
                path = %self.journal.journal_path.display(),
                torn_bytes = replay.torn_bytes,
                "discarding torn journal tail"
            );
            self.journal.truncate_to(replay.valid_len)?;
        }

        let replayed = replay.entries.len();
        for entry in replay.entries {
            match entry {
                JournalEntry::Put { doc } => {
                    documents.insert(doc.id.clone(), doc);
                }
            }
        }
        self.journal.entries_since_checkpoint = replayed;

        event!(
            Level::DEBUG,
            doc_count = documents.len(),
            replayed,
            "store recovered"
        );
        Ok(documents)
    }

    pub fn journal(&self) -> &JournalManager {
        &self.journal
    }
    pub fn journal_mut(&mut self) -> &mut JournalManager {
        &mut self.journal
    }
    pub fn snapshot(&self) -> &SnapshotManager {
        &self.snapshot
    }
    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }
}
