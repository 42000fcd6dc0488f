//! The single source of truth for the outline and the caret.
//!
//! Every mutation swaps in a complete new root, so a reader never sees a
//! half-applied edit.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::{Block, BlockId, EditError, Merge, SerializedBlock};

mod storage;

pub use storage::{FileStorage, MemoryStorage, Storage};

pub const DEFAULT_STORAGE_KEY: &str = "outline";

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("storage error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed outline: {0}")]
    Json(#[from] serde_json::Error),
}

/// Logical caret location: a block and a char offset into its content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaretPosition {
    pub block_id: BlockId,
    pub offset: usize,
}

impl CaretPosition {
    pub fn new(block_id: BlockId, offset: usize) -> Self {
        Self { block_id, offset }
    }
}

pub struct Store {
    root: Block,
    caret: Option<CaretPosition>,
    storage: Box<dyn Storage>,
    key: String,
    dirty: bool,
}

impl Store {
    pub fn new(root: Block, storage: Box<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            root,
            caret: None,
            storage,
            key: key.into(),
            dirty: false,
        }
    }

    /// A store backed by [`MemoryStorage`].
    pub fn in_memory(root: Block) -> Self {
        Self::new(root, Box::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY)
    }

    /// Restores the outline saved under `key`, or starts from the default
    /// outline when nothing usable is stored.
    pub fn load(storage: Box<dyn Storage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let root = match read_outline(storage.as_ref(), &key) {
            Ok(Some(root)) => root,
            Ok(None) => {
                log::info!("no saved outline under {key:?}, starting fresh");
                default_outline()
            }
            Err(err) => {
                log::error!("failed to restore outline {key:?}: {err}");
                default_outline()
            }
        };
        Self::new(root, storage, key)
    }

    pub fn root(&self) -> &Block {
        &self.root
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Whether the outline changed since the last [`Store::persist`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replaces the whole outline. A caret pointing at a block that no longer
    /// exists is cleared.
    pub fn set_root(&mut self, root: Block) -> std::result::Result<(), EditError> {
        root.validate()?;
        self.replace_root(root);
        Ok(())
    }

    fn replace_root(&mut self, root: Block) {
        self.root = root;
        self.dirty = true;
        self.drop_stale_caret();
    }

    pub fn find_block_by_id(&self, id: &BlockId) -> Option<&Block> {
        self.root.find_block_by_id(id)
    }

    pub fn update_block_by_id(
        &mut self,
        id: &BlockId,
        block: Block,
    ) -> std::result::Result<(), EditError> {
        let root = self
            .root
            .update_block_by_id(id, block)
            .ok_or_else(|| EditError::NotFound(id.clone()))?;
        self.set_root(root)
    }

    /// Commits edited text into block `id`, keeping its children.
    pub fn update_content(&mut self, id: &BlockId, content: &str) -> std::result::Result<(), EditError> {
        let block = self
            .find_block_by_id(id)
            .ok_or_else(|| EditError::NotFound(id.clone()))?;
        if block.content() == content {
            return Ok(());
        }
        let updated = block.with_content(content);
        self.update_block_by_id(id, updated)
    }

    /// Splits block `id` and returns the id of the new block.
    pub fn split_block_at_caret(
        &mut self,
        id: &BlockId,
        before: &str,
        after: &str,
    ) -> std::result::Result<BlockId, EditError> {
        let split = self.root.split_at_caret(id, before, after)?;
        self.replace_root(split.root);
        Ok(split.new_block)
    }

    pub fn indent(&mut self, id: &BlockId) -> std::result::Result<(), EditError> {
        let root = self.root.indent(id)?;
        self.replace_root(root);
        Ok(())
    }

    pub fn outdent(&mut self, id: &BlockId) -> std::result::Result<(), EditError> {
        let root = self.root.outdent(id)?;
        self.replace_root(root);
        Ok(())
    }

    /// Merges block `id` into its predecessor and returns where the caret
    /// belongs afterwards.
    pub fn merge_into_previous(&mut self, id: &BlockId) -> std::result::Result<CaretPosition, EditError> {
        let Merge {
            root,
            target,
            offset,
        } = self.root.merge_into_previous(id)?;
        self.replace_root(root);
        Ok(CaretPosition::new(target, offset))
    }

    pub fn caret_position(&self) -> Option<&CaretPosition> {
        self.caret.as_ref()
    }

    /// A position naming a missing block clears the caret instead.
    pub fn set_caret_position(&mut self, caret: Option<CaretPosition>) {
        self.caret = caret;
        self.drop_stale_caret();
    }

    fn drop_stale_caret(&mut self) {
        if let Some(caret) = &self.caret
            && !self.root.contains(&caret.block_id)
        {
            log::warn!("clearing caret on missing block {}", caret.block_id);
            self.caret = None;
        }
    }

    /// Forgets the saved outline and starts over from the default one.
    pub fn reset_to_initial(&mut self) -> Result<()> {
        self.root = default_outline();
        self.caret = None;
        self.dirty = false;
        self.storage.remove(&self.key)?;
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root.to_serializable())?)
    }

    /// Writes the outline to storage.
    pub fn persist(&mut self) -> Result<()> {
        let json = self.to_json_pretty()?;
        self.storage.set(&self.key, &json)?;
        self.dirty = false;
        log::debug!("persisted {} blocks under {:?}", self.root.block_count(), self.key);
        Ok(())
    }
}

fn read_outline(storage: &dyn Storage, key: &str) -> Result<Option<Block>> {
    let Some(json) = storage.get(key)? else {
        return Ok(None);
    };
    let serialized: SerializedBlock = serde_json::from_str(&json)?;
    Ok(Some(Block::from_serializable(&serialized)?))
}

/// The outline shown on first start and after a reset.
pub fn default_outline() -> Block {
    Block::root(vec![
        Block::new("Welcome to pure-outline"),
        Block::with_children(
            "Editing",
            vec![
                Block::new("Enter splits a block at the caret"),
                Block::new("Shift+Enter or Ctrl+J adds a line break\ninside the same block"),
                Block::new("Backspace at the start of a block joins it with the one above"),
            ],
        ),
        Block::with_children(
            "Structure",
            vec![
                Block::new("Tab indents a block under its previous sibling"),
                Block::new("Shift+Tab moves it back out"),
            ],
        ),
        Block::with_children(
            "Moving around",
            vec![
                Block::new("Arrow keys cross block boundaries"),
                Block::new("Ctrl+A and Ctrl+E jump to the start and end of a line"),
                Block::new("Click anywhere to place the caret"),
            ],
        ),
        Block::new("Inline `code` and [links](https://example.com) are rendered"),
        Block::new("Ctrl+S saves, F2 shows the JSON, Ctrl+K resets, Ctrl+Q quits"),
    ])
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
