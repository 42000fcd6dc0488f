use std::rc::Rc;

use super::{Block, BlockId, BlockPath, EditError};

/// Result of splitting a block at the caret.
#[derive(Clone, Debug)]
pub struct Split {
    pub root: Block,
    pub new_block: BlockId,
}

/// Result of merging a block into its predecessor.
#[derive(Clone, Debug)]
pub struct Merge {
    pub root: Block,
    /// The block that absorbed the merged content.
    pub target: BlockId,
    /// Former end of the target's content, where the caret belongs.
    pub offset: usize,
}

impl Block {
    fn locate(&self, id: &BlockId) -> Result<BlockPath, EditError> {
        self.path_of(id)
            .ok_or_else(|| EditError::NotFound(id.clone()))
    }

    fn located_block(&self, path: &BlockPath) -> Result<&Block, EditError> {
        self.block_at(path)
            .ok_or(EditError::Inconsistent("located path does not resolve"))
    }

    /// Splits block `id`: it keeps `before`, and a new block holding `after`
    /// becomes its first child when it has children, otherwise its next
    /// sibling.
    pub fn split_at_caret(&self, id: &BlockId, before: &str, after: &str) -> Result<Split, EditError> {
        let path = self.locate(id)?;
        let (Some(parent_path), Some(idx)) = (path.parent(), path.last_index()) else {
            log::debug!("cannot split the root block");
            return Err(EditError::IsRoot);
        };
        let block = self.located_block(&path)?;
        let new_block = Block::new(after);
        let new_id = new_block.id().clone();

        // 1. With children, the remainder nests as the first child.
        if block.has_children() {
            let mut children = Vec::with_capacity(block.children.len() + 1);
            children.push(Rc::new(new_block));
            children.extend(block.children.iter().cloned());
            let updated = Block::from_parts(block.id.clone(), before, children);
            let root = self.rebuild_at(&path, |_| updated)?;
            return Ok(Split {
                root,
                new_block: new_id,
            });
        }

        // 2. Otherwise it becomes the next sibling.
        let updated = block.with_content(before);
        let root = self.rebuild_at(&parent_path, |parent| {
            let mut children = parent.children.clone();
            children[idx] = Rc::new(updated);
            children.insert(idx + 1, Rc::new(new_block));
            parent.with_replaced_children(children)
        })?;
        Ok(Split {
            root,
            new_block: new_id,
        })
    }

    /// Moves block `id` to the end of its preceding sibling's children.
    ///
    /// A first child cannot be indented; the error reports the unchanged
    /// parent.
    pub fn indent(&self, id: &BlockId) -> Result<Block, EditError> {
        let path = self.locate(id)?;
        let (Some(parent_path), Some(idx)) = (path.parent(), path.last_index()) else {
            log::debug!("block has no parent: {id}");
            return Err(EditError::IsRoot);
        };
        if idx == 0 {
            let parent = self.located_block(&parent_path)?;
            log::debug!("cannot indent block that is the first child of its parent");
            return Err(EditError::NoPreviousSibling {
                parent: parent.id.clone(),
            });
        }

        self.rebuild_at(&parent_path, |parent| {
            let mut children = parent.children.clone();
            let moved = children.remove(idx);
            let previous = &children[idx - 1];
            let mut adopted = previous.children.clone();
            adopted.push(moved);
            let previous = Rc::new(previous.with_replaced_children(adopted));
            children[idx - 1] = previous;
            parent.with_replaced_children(children)
        })
    }

    /// Moves block `id` (with its own subtree) to just after its former
    /// parent. Younger siblings stay with the old parent.
    pub fn outdent(&self, id: &BlockId) -> Result<Block, EditError> {
        let path = self.locate(id)?;
        let (Some(parent_path), Some(idx)) = (path.parent(), path.last_index()) else {
            log::debug!("block has no parent: {id}");
            return Err(EditError::IsRoot);
        };
        let (Some(grandparent_path), Some(parent_idx)) =
            (parent_path.parent(), parent_path.last_index())
        else {
            log::debug!("cannot outdent block that is a child of the root");
            return Err(EditError::TopLevel);
        };

        self.rebuild_at(&grandparent_path, |grandparent| {
            let mut uncles = grandparent.children.clone();
            let parent = &uncles[parent_idx];
            let mut siblings = parent.children.clone();
            let moved = siblings.remove(idx);
            let parent = Rc::new(parent.with_replaced_children(siblings));
            uncles[parent_idx] = parent;
            uncles.insert(parent_idx + 1, moved);
            grandparent.with_replaced_children(uncles)
        })
    }

    /// Backspace at the start of a childless block: appends its content to
    /// the previous block in pre-order and removes it.
    pub fn merge_into_previous(&self, id: &BlockId) -> Result<Merge, EditError> {
        let path = self.locate(id)?;
        let (Some(parent_path), Some(idx)) = (path.parent(), path.last_index()) else {
            return Err(EditError::IsRoot);
        };
        let block = self.located_block(&path)?;
        if block.has_children() {
            log::debug!("cannot merge block {id}: it has children");
            return Err(EditError::HasChildren);
        }
        let prev_path = self
            .prev_path(&path)
            .ok_or(EditError::Inconsistent("non-root block has no predecessor"))?;
        if prev_path.is_root() {
            log::debug!("cannot merge block {id} into the root");
            return Err(EditError::MergeIntoRoot);
        }
        let prev = self.located_block(&prev_path)?;
        let offset = prev.content_len();
        let target = prev.id.clone();
        let merged = format!("{}{}", prev.content, block.content);

        // The predecessor is either the parent or inside an older sibling, so
        // removing the merged block leaves its path intact.
        let without = self.rebuild_at(&parent_path, |parent| {
            let mut children = parent.children.clone();
            children.remove(idx);
            parent.with_replaced_children(children)
        })?;
        let root = without.rebuild_at(&prev_path, |prev| prev.with_content(merged))?;
        Ok(Merge {
            root,
            target,
            offset,
        })
    }
}
