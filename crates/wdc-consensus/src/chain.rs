//! Read-only view of the block index consumed by retargeting.
//!
//! Block storage owns the nodes. Retargeting only needs per-node
//! height/time/bits plus two traversals: the immediate predecessor and the
//! ancestor at a given height. Nodes reachable through these traversals
//! must never change once exposed.

use crate::compact::CompactTarget;

/// The fields of an indexed block that retargeting reads.
pub trait BlockIndexNode {
    /// Height in the chain, genesis is 0.
    fn height(&self) -> u32;
    /// Block timestamp in Unix seconds.
    fn time(&self) -> i64;
    /// Compact target stored in the header.
    fn bits(&self) -> CompactTarget;
}

/// Ancestor traversal over an immutable block index.
pub trait ChainIndex {
    /// Node type handed out by this index.
    type Node: BlockIndexNode;

    /// Immediate predecessor of `node`, `None` for genesis.
    fn predecessor<'a>(&'a self, node: &Self::Node) -> Option<&'a Self::Node>;

    /// Ancestor of `node` at `height`, `node` itself when the heights match.
    ///
    /// The default walks predecessors one at a time; indexes with skip
    /// pointers should override it.
    fn ancestor<'a>(&'a self, node: &'a Self::Node, height: u32) -> Option<&'a Self::Node> {
        if height > node.height() {
            return None;
        }
        let mut current = node;
        while current.height() > height {
            current = self.predecessor(current)?;
        }
        Some(current)
    }
}

/// Plain header fields, for indexes that store nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    pub height: u32,
    pub time: i64,
    pub bits: CompactTarget,
}

impl BlockIndexNode for HeaderFields {
    fn height(&self) -> u32 {
        self.height
    }

    fn time(&self) -> i64 {
        self.time
    }

    fn bits(&self) -> CompactTarget {
        self.bits
    }
}
