//! mdbx-backed implementation of the message store.

use crate::{
    store::{Batch, BatchOp, MessageStore},
    tables::{MessageBytes, Messages, StreamerMeta, StreamerTables, MESSAGE_COUNT_KEY},
    StorageError,
};
use alloy_rlp::Decodable;
use reth_db::{
    mdbx::{init_db_for, DatabaseArguments},
    DatabaseEnv,
};
use reth_db_api::{
    cursor::DbCursorRO,
    database::Database,
    transaction::{DbTx, DbTxMut},
};
use std::path::Path;
use tracing::debug;

/// Message store persisted in an embedded mdbx environment.
#[derive(Debug)]
pub struct MdbxMessageStore {
    env: DatabaseEnv,
}

impl MdbxMessageStore {
    /// Creates or opens a streamer database at the given path.
    ///
    /// On open the total-count cell is initialized to 0 when absent, so
    /// [`MessageStore::message_count`] is always readable afterwards.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let env = init_db_for::<_, StreamerTables>(path, DatabaseArguments::default())
            .map_err(|e| StorageError::DatabaseInit(e.into()))?;
        let store = Self { env };
        store.cleanup_inconsistent_state()?;
        Ok(store)
    }

    /// Repairs state left behind by an interrupted run.
    fn cleanup_inconsistent_state(&self) -> Result<(), StorageError> {
        if self.stored_message_count()?.is_none() {
            debug!(target: "streamer_storage", "initializing message count to zero");
            let mut batch = Batch::new();
            batch.set_message_count(0);
            self.write_batch(batch)?;
        }
        // TODO: prune message rows at and past the stored count that a crash
        // between batch commits can leave behind.
        Ok(())
    }

    fn stored_message_count(&self) -> Result<Option<u64>, StorageError> {
        let value = self.env.view(|tx| tx.get::<StreamerMeta>(MESSAGE_COUNT_KEY))??;
        value
            .map(|raw| u64::decode(&mut raw.0.as_slice()).map_err(StorageError::Decode))
            .transpose()
    }
}

impl MessageStore for MdbxMessageStore {
    fn message(&self, index: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self.env.view(|tx| tx.get::<Messages>(index))??;
        Ok(value.map(|raw| raw.0))
    }

    fn message_count(&self) -> Result<u64, StorageError> {
        self.stored_message_count()?
            .ok_or_else(|| StorageError::EntryNotFound("message count".to_string()))
    }

    fn write_batch(&self, batch: Batch) -> Result<(), StorageError> {
        self.env.update(|tx| apply_batch(tx, batch))?
    }
}

fn apply_batch<TX: DbTx + DbTxMut>(tx: &TX, batch: Batch) -> Result<(), StorageError> {
    for op in batch.into_ops() {
        match op {
            BatchOp::PutMessage { index, encoded } => {
                tx.put::<Messages>(index, MessageBytes(encoded))?;
            }
            BatchOp::DeleteMessagesFrom { index } => {
                let mut cursor = tx.cursor_write::<Messages>()?;
                let stale: Vec<u64> = cursor
                    .walk_range(index..)?
                    .map(|row| row.map(|(key, _)| key))
                    .collect::<Result<_, _>>()?;
                for key in stale {
                    tx.delete::<Messages>(key, None)?;
                }
            }
            BatchOp::SetMessageCount { count } => {
                tx.put::<StreamerMeta>(MESSAGE_COUNT_KEY, MessageBytes(alloy_rlp::encode(count)))?;
            }
        }
    }
    Ok(())
}
