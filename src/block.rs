//! The outline tree.
//!
//! A [`Block`] is immutable once built. Edits produce a new root by copying
//! the nodes on the path from the edited block up to the root; all other
//! subtrees are shared through `Rc`. Parents are never stored, they are
//! derived from a [`BlockPath`] found by id lookup.
//!
//! Traversal is pre-order depth-first unless stated otherwise.

use std::{collections::HashSet, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod structure;
mod traverse;

pub use structure::{Merge, Split};
pub use traverse::{BlockPath, PreOrder};

/// Opaque block identifier. Fresh ids are v4 UUIDs; persisted ids are kept
/// verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a tree edit did not happen.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("block {0} was not found")]
    NotFound(BlockId),
    #[error("the root block cannot be restructured")]
    IsRoot,
    #[error("block is the first child of {parent}, there is nothing to indent under")]
    NoPreviousSibling { parent: BlockId },
    #[error("top-level blocks cannot be outdented")]
    TopLevel,
    #[error("blocks with children cannot be merged")]
    HasChildren,
    #[error("cannot merge into the root block")]
    MergeIntoRoot,
    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),
    #[error("outline structure is inconsistent: {0}")]
    Inconsistent(&'static str),
}

impl EditError {
    /// Expected rejections that the user should never notice, as opposed to
    /// broken invariants.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, EditError::DuplicateId(_) | EditError::Inconsistent(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    content: String,
    children: Vec<Rc<Block>>,
}

impl Block {
    pub fn new(content: impl Into<String>) -> Self {
        Self::from_parts(BlockId::new(), content, Vec::new())
    }

    pub fn with_children(content: impl Into<String>, children: Vec<Block>) -> Self {
        Self::from_parts(
            BlockId::new(),
            content,
            children.into_iter().map(Rc::new).collect(),
        )
    }

    /// An invisible container whose children are the top-level blocks.
    pub fn root(children: Vec<Block>) -> Self {
        Self::with_children("", children)
    }

    pub fn from_parts(id: BlockId, content: impl Into<String>, children: Vec<Rc<Block>>) -> Self {
        Self {
            id,
            content: content.into(),
            children,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content length in chars.
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn children(&self) -> &[Rc<Block>] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn first_child(&self) -> Option<&Block> {
        self.children.first().map(Rc::as_ref)
    }

    pub fn last_child(&self) -> Option<&Block> {
        self.children.last().map(Rc::as_ref)
    }

    /// Same id and (shared) children, new content.
    pub fn with_content(&self, content: impl Into<String>) -> Block {
        Block::from_parts(self.id.clone(), content, self.children.clone())
    }

    /// Same id and content, new children.
    pub fn with_replaced_children(&self, children: Vec<Rc<Block>>) -> Block {
        Block::from_parts(self.id.clone(), self.content.clone(), children)
    }

    /// Number of blocks in this subtree, including `self`.
    pub fn block_count(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order iteration yielding `(depth, block)`, starting with `self` at
    /// depth 0.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder::new(self)
    }

    /// Retrieve a descendant (or `self`) by id.
    ///
    /// O(number of descendants), acceptable for the expected outline sizes
    /// (< 1000 blocks).
    pub fn find_block_by_id(&self, id: &BlockId) -> Option<&Block> {
        if &self.id == id {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_block_by_id(id))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.find_block_by_id(id).is_some()
    }

    /// Returns a new tree with the block matching `id` replaced by
    /// `replacement`. Only the ancestors of the match are rebuilt.
    ///
    /// `None` when no block has that id.
    pub fn update_block_by_id(&self, id: &BlockId, replacement: Block) -> Option<Block> {
        let path = self.path_of(id)?;
        self.rebuild_at(&path, |_| replacement).ok()
    }

    /// Rebuilds the block at `path` with `f`, copying every ancestor.
    pub(crate) fn rebuild_at(
        &self,
        path: &BlockPath,
        f: impl FnOnce(&Block) -> Block,
    ) -> Result<Block, EditError> {
        self.rebuild_steps(path.steps(), f)
    }

    fn rebuild_steps(
        &self,
        steps: &[usize],
        f: impl FnOnce(&Block) -> Block,
    ) -> Result<Block, EditError> {
        let Some((&idx, rest)) = steps.split_first() else {
            return Ok(f(self));
        };
        let child = self
            .children
            .get(idx)
            .ok_or(EditError::Inconsistent("path points past the last child"))?;
        let rebuilt = child.rebuild_steps(rest, f)?;
        let mut children = self.children.clone();
        children[idx] = Rc::new(rebuilt);
        Ok(self.with_replaced_children(children))
    }

    /// Checks that every id occurs once.
    pub fn validate(&self) -> Result<(), EditError> {
        let mut seen = HashSet::new();
        for (_, block) in self.iter() {
            if !seen.insert(block.id()) {
                return Err(EditError::DuplicateId(block.id().clone()));
            }
        }
        Ok(())
    }

    pub fn to_serializable(&self) -> SerializedBlock {
        SerializedBlock {
            id: self.id.to_string(),
            content: self.content.clone(),
            children: self
                .children
                .iter()
                .map(|child| child.to_serializable())
                .collect(),
        }
    }

    /// Rebuilds a tree from its plain form, rejecting duplicate ids.
    pub fn from_serializable(serialized: &SerializedBlock) -> Result<Block, EditError> {
        let block = Self::build_from_serialized(serialized);
        block.validate()?;
        Ok(block)
    }

    fn build_from_serialized(serialized: &SerializedBlock) -> Block {
        Block::from_parts(
            BlockId::from(serialized.id.as_str()),
            serialized.content.clone(),
            serialized
                .children
                .iter()
                .map(|child| Rc::new(Self::build_from_serialized(child)))
                .collect(),
        )
    }
}

/// Persistence form: `{id, content, children?}` with `children` omitted for
/// leaves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedBlock>,
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod block_tests;
