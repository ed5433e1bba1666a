use super::error::{InternalError, Subsystem};
use super::symbol_table::ScopeId;

/// Id of a sequence point within its owning Sequence.
/// Points are stored in an append-only arena so ids stay valid for the
/// lifetime of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointId(usize);

/// Classification of a sequence point.
/// A Block starts out Sync and is promoted to Async when a yield is
/// inserted anywhere inside it. Promotion is monotone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Sync,
    Async,
    Yield,
}

#[derive(Debug, Clone)]
struct BlockData {
    scope: ScopeId,
    child: Option<PointId>,
}

/// A point in the sequence graph of a function body.
/// Block points mirror statement blocks and carry the block's scope;
/// plain points are yield markers inserted for await statements.
#[derive(Debug, Clone)]
pub struct SequencePoint {
    pub kind: PointKind,
    next: Option<PointId>,
    parent: Option<PointId>,
    block: Option<BlockData>,
}

impl SequencePoint {
    pub fn is_async(&self) -> bool {
        self.kind != PointKind::Sync
    }

    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.block.as_ref().map(|block| block.scope)
    }
}

/// Saved cursor state. Restoring a snapshot is side effect free, which
/// lets the code generator pre-scan branches without advancing the
/// global position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCursor {
    point: Option<PointId>,
    block: Option<PointId>,
}

/// Per-function record of the asynchrony shape of a body.
///
/// The tree is built once during scope analysis (blocks on block entry,
/// yields on await) and rewalked by the code generator to decide whether
/// a function lowers to a plain thunk or a resumable state machine.
/// A function is asynchronous iff the root block is Async.
#[derive(Debug, Clone)]
pub struct Sequence {
    points: Vec<SequencePoint>,
    pub start: PointId,
    current_point: Option<PointId>,
    current_block: Option<PointId>,
}

impl Sequence {
    pub fn new(scope: ScopeId) -> Self {
        let root = SequencePoint {
            kind: PointKind::Sync,
            next: None,
            parent: None,
            block: Some(BlockData { scope, child: None }),
        };
        Sequence {
            points: vec![root],
            start: PointId(0),
            current_point: Some(PointId(0)),
            current_block: Some(PointId(0)),
        }
    }

    pub fn point(&self, id: PointId) -> &SequencePoint {
        &self.points[id.0]
    }

    pub fn current_point(&self) -> Option<PointId> {
        self.current_point
    }

    pub fn current_block(&self) -> Option<PointId> {
        self.current_block
    }

    pub fn current_point_is_async(&self) -> bool {
        match self.current_point {
            Some(id) => self.point(id).is_async(),
            None => false,
        }
    }

    pub fn current_block_is_async(&self) -> bool {
        match self.current_block {
            Some(id) => self.point(id).is_async(),
            None => false,
        }
    }

    /// Whether the function this sequence belongs to is asynchronous.
    pub fn is_async(&self) -> bool {
        self.point(self.start).is_async()
    }

    /// Scope of the root block, which is the function scope.
    pub fn root_scope(&self) -> ScopeId {
        match self.point(self.start).scope() {
            Some(scope) => scope,
            None => InternalError::fatal(Subsystem::ScopeAnalysis, "Sequence root is not a block."),
        }
    }

    /// Attach a freshly created point at the cursor: as first child when
    /// the cursor rests on the current block itself, as a sibling of the
    /// current point otherwise.
    fn attach(&mut self, id: PointId) {
        let point = match self.current_point {
            Some(point) => point,
            None => InternalError::fatal(Subsystem::ScopeAnalysis, "Sequence cursor ran past the end during construction."),
        };
        if self.current_block == Some(point) {
            let block = self.points[point.0].block.as_mut().unwrap();
            if block.child.is_some() {
                InternalError::fatal(Subsystem::ScopeAnalysis, "Sequence block child attached twice.");
            }
            block.child = Some(id);
        } else {
            if self.points[point.0].next.is_some() {
                InternalError::fatal(Subsystem::ScopeAnalysis, "Sequence sibling attached twice.");
            }
            self.points[point.0].next = Some(id);
        }
    }

    /// Open a new block for an entered statement scope and descend into it.
    pub fn enter_block(&mut self, scope: ScopeId) -> &mut Self {
        let id = PointId(self.points.len());
        self.points.push(SequencePoint {
            kind: PointKind::Sync,
            next: None,
            parent: self.current_block,
            block: Some(BlockData { scope, child: None }),
        });
        self.attach(id);
        self.current_point = Some(id);
        self.current_block = Some(id);
        self
    }

    /// Ascend out of the current block. The block itself becomes the
    /// current point so a following point attaches as its sibling.
    pub fn leave_block(&mut self) -> &mut Self {
        let block = match self.current_block {
            Some(block) => block,
            None => InternalError::fatal(Subsystem::ScopeAnalysis, "leave_block called outside any block."),
        };
        self.current_point = Some(block);
        self.current_block = self.point(block).parent;
        self
    }

    /// Record a suspension point at the cursor and promote the enclosing
    /// block chain to Async.
    pub fn yield_point(&mut self) -> &mut Self {
        let id = PointId(self.points.len());
        self.points.push(SequencePoint {
            kind: PointKind::Yield,
            next: None,
            parent: self.current_block,
            block: None,
        });
        self.attach(id);
        self.current_point = Some(id);
        if let Some(block) = self.current_block {
            self.mark_async(block);
        }
        self
    }

    fn mark_async(&mut self, block: PointId) {
        let mut current = Some(block);
        while let Some(id) = current {
            self.points[id.0].kind = PointKind::Async;
            current = self.points[id.0].parent;
        }
    }

    pub fn reset(&mut self) {
        self.current_point = Some(self.start);
        self.current_block = Some(self.start);
    }

    /// Advance the cursor one step in preorder: into a block's first
    /// child if present, else to the adjacent point, else to the nearest
    /// ancestor's adjacent point. Returns the new current point.
    pub fn next(&mut self) -> Option<PointId> {
        let current = self.current_point?;

        let mut new_point = None;
        if let Some(block) = &self.point(current).block {
            new_point = block.child;
        }
        if new_point.is_none() {
            new_point = self.point(current).next;
        }
        if new_point.is_none() {
            let mut ancestor = self.point(current).parent;
            while let Some(id) = ancestor {
                if let Some(next) = self.point(id).next {
                    new_point = Some(next);
                    break;
                }
                ancestor = self.point(id).parent;
            }
        }

        self.current_point = new_point;
        self.current_block = match new_point {
            Some(id) if self.point(id).is_block() => Some(id),
            Some(id) => self.point(id).parent,
            None => None,
        };
        new_point
    }

    /// Move the cursor to the point adjacent to the current one without
    /// descending. Used when pre-scanning if/else branches.
    pub fn skip_to_adjacent(&mut self) {
        if let Some(current) = self.current_point {
            self.current_point = self.point(current).next;
        }
    }

    pub fn snapshot(&self) -> SequenceCursor {
        SequenceCursor {
            point: self.current_point,
            block: self.current_block,
        }
    }

    pub fn restore(&mut self, cursor: SequenceCursor) {
        self.current_point = cursor.point;
        self.current_block = cursor.block;
    }

    pub fn is_next_async(&mut self) -> bool {
        let cursor = self.snapshot();
        let result = match self.next() {
            Some(id) => self.point(id).is_async(),
            None => false,
        };
        self.restore(cursor);
        result
    }

    pub fn is_next_yield(&mut self) -> bool {
        let cursor = self.snapshot();
        let result = match self.next() {
            Some(id) => self.point(id).kind == PointKind::Yield,
            None => false,
        };
        self.restore(cursor);
        result
    }

    /// Scopes of every Async block, in creation order. The code generator
    /// sizes an async functor's State struct from these and uses them to
    /// decide whether an identifier lives in the state.
    pub fn async_block_scopes(&self) -> Vec<ScopeId> {
        self.points.iter()
            .filter(|point| point.is_block() && point.kind == PointKind::Async)
            .map(|point| point.scope().unwrap())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(id: usize) -> ScopeId {
        ScopeId::new(id)
    }

    #[test]
    fn new_sequence_starts_sync() {
        let seq = Sequence::new(scope(1));
        assert!(!seq.is_async());
        assert_eq!(seq.current_point(), Some(seq.start));
        assert_eq!(seq.current_block(), Some(seq.start));
    }

    #[test]
    fn yield_promotes_block_chain_to_async() {
        let mut seq = Sequence::new(scope(1));
        seq.enter_block(scope(2));
        seq.enter_block(scope(3));
        seq.yield_point();
        seq.leave_block();
        seq.leave_block();

        assert!(seq.is_async());
        assert_eq!(seq.async_block_scopes(), vec![scope(1), scope(2), scope(3)]);
    }

    #[test]
    fn sibling_block_stays_sync_after_yield_elsewhere() {
        let mut seq = Sequence::new(scope(1));
        seq.enter_block(scope(2));
        seq.yield_point();
        seq.leave_block();
        seq.enter_block(scope(3));
        seq.leave_block();

        assert_eq!(seq.async_block_scopes(), vec![scope(1), scope(2)]);
    }

    #[test]
    fn next_walks_points_in_preorder() {
        // root { blockA { yield } blockB }
        let mut seq = Sequence::new(scope(1));
        seq.enter_block(scope(2));
        seq.yield_point();
        seq.leave_block();
        seq.enter_block(scope(3));
        seq.leave_block();
        seq.reset();

        let a = seq.next().unwrap();
        assert_eq!(seq.point(a).scope(), Some(scope(2)));
        let y = seq.next().unwrap();
        assert_eq!(seq.point(y).kind, PointKind::Yield);
        assert_eq!(seq.current_block(), Some(a));
        let b = seq.next().unwrap();
        assert_eq!(seq.point(b).scope(), Some(scope(3)));
        assert_eq!(seq.next(), None);
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut seq = Sequence::new(scope(1));
        seq.enter_block(scope(2));
        seq.yield_point();
        seq.leave_block();
        seq.reset();

        let cursor = seq.snapshot();
        seq.next();
        seq.next();
        seq.restore(cursor);
        assert_eq!(seq.snapshot(), cursor);
        assert_eq!(seq.current_point(), Some(seq.start));
    }

    #[test]
    fn is_next_async_does_not_move_the_cursor() {
        let mut seq = Sequence::new(scope(1));
        seq.enter_block(scope(2));
        seq.yield_point();
        seq.leave_block();
        seq.reset();

        let cursor = seq.snapshot();
        assert!(seq.is_next_async());
        assert_eq!(seq.snapshot(), cursor);
    }

    #[test]
    fn is_next_yield_sees_upcoming_awaits() {
        let mut seq = Sequence::new(scope(1));
        seq.yield_point();
        seq.reset();
        assert!(seq.is_next_yield());
        seq.next();
        assert!(!seq.is_next_yield());
    }
}
