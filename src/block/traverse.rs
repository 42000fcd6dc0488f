use super::{Block, BlockId};

/// Child-index steps from the root to a block. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPath {
    steps: Vec<usize>,
}

impl BlockPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<usize>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nesting depth; top-level blocks have depth 1.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Index of the block within its parent's children.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.last().copied()
    }

    pub fn parent(&self) -> Option<BlockPath> {
        let (_, prefix) = self.steps.split_last()?;
        Some(Self::from_steps(prefix.to_vec()))
    }

    pub fn child(&self, idx: usize) -> BlockPath {
        let mut steps = self.steps.clone();
        steps.push(idx);
        Self::from_steps(steps)
    }

    fn push(&mut self, idx: usize) {
        self.steps.push(idx);
    }

    fn pop(&mut self) {
        self.steps.pop();
    }
}

impl Block {
    /// Depth-first search for the path of `id`.
    pub fn path_of(&self, id: &BlockId) -> Option<BlockPath> {
        let mut path = BlockPath::root();
        if self.collect_path(id, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn collect_path(&self, id: &BlockId, path: &mut BlockPath) -> bool {
        if &self.id == id {
            return true;
        }
        for (idx, child) in self.children.iter().enumerate() {
            path.push(idx);
            if child.collect_path(id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    pub fn block_at(&self, path: &BlockPath) -> Option<&Block> {
        let mut block = self;
        for &idx in path.steps() {
            block = block.children.get(idx)?.as_ref();
        }
        Some(block)
    }

    pub fn parent_of(&self, id: &BlockId) -> Option<&Block> {
        let parent = self.path_of(id)?.parent()?;
        self.block_at(&parent)
    }

    pub fn is_root_id(&self, id: &BlockId) -> bool {
        &self.id == id
    }

    /// The deepest, rightmost block of this subtree (`self` for a leaf).
    pub fn last_descendant(&self) -> &Block {
        let mut block = self;
        while let Some(last) = block.last_child() {
            block = last;
        }
        block
    }

    /// Pre-order successor of the block at `path`.
    pub fn next_path(&self, path: &BlockPath) -> Option<BlockPath> {
        let block = self.block_at(path)?;

        // A block with children continues with its first child.
        if block.has_children() {
            return Some(path.child(0));
        }

        // Otherwise climb until an ancestor-or-self has a next sibling.
        let mut current = path.clone();
        while let Some(idx) = current.last_index() {
            let parent = current.parent()?;
            let siblings = self.block_at(&parent)?.children.len();
            if idx + 1 < siblings {
                return Some(parent.child(idx + 1));
            }
            current = parent;
        }
        None
    }

    /// Pre-order predecessor of the block at `path`.
    ///
    /// A first child's predecessor is its parent, which may be the root path;
    /// callers that must not land on the invisible root check for it.
    pub fn prev_path(&self, path: &BlockPath) -> Option<BlockPath> {
        let idx = path.last_index()?;
        let parent = path.parent()?;
        if idx == 0 {
            return Some(parent);
        }

        let mut prev = parent.child(idx - 1);
        let mut block = self.block_at(&prev)?;
        while let Some(last) = block.children.len().checked_sub(1) {
            prev.push(last);
            block = block.children[last].as_ref();
        }
        Some(prev)
    }

    /// Retrieve the next block in pre-order.
    pub fn next_block(&self, id: &BlockId) -> Option<&Block> {
        let path = self.next_path(&self.path_of(id)?)?;
        self.block_at(&path)
    }

    /// Retrieve the previous block in pre-order. May be `self` (the root)
    /// when `id` names a top-level first child.
    pub fn prev_block(&self, id: &BlockId) -> Option<&Block> {
        let path = self.prev_path(&self.path_of(id)?)?;
        self.block_at(&path)
    }
}

/// Pre-order iterator over a subtree, yielding `(depth, block)`.
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a Block)>,
}

impl<'a> PreOrder<'a> {
    pub(super) fn new(root: &'a Block) -> Self {
        Self {
            stack: vec![(0, root)],
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, block) = self.stack.pop()?;
        self.stack.extend(
            block
                .children
                .iter()
                .rev()
                .map(|child| (depth + 1, child.as_ref())),
        );
        Some((depth, block))
    }
}
