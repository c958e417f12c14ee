//! Test harness for integration tests.
//!
//! Provides an arena-backed block tree that implements [`ChainIndex`] with
//! skip pointers and forks, plus header and auxpow test doubles.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wdc_consensus::{
    next_work_required, AuxPowProof, BlockHeader, BlockIndexNode, BlockVersion, ChainIndex,
    ChainParams, CompactTarget, Hash256, InvariantViolation,
};

/// Install a test-writer subscriber once; filter with `RUST_LOG`.
pub fn init_test_tracing() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Index of a node inside a [`BlockTree`].
pub type NodeId = usize;

/// A block stored in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Position in the arena.
    pub id: NodeId,
    /// Parent position, `None` for genesis.
    pub parent: Option<NodeId>,
    /// Far ancestor used to speed up height lookups.
    pub skip: Option<NodeId>,
    pub height: u32,
    pub time: i64,
    pub bits: CompactTarget,
}

impl BlockIndexNode for TreeNode {
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

/// Append-only block tree. Nodes never move or change once inserted, so
/// references handed out stay valid for the tree's lifetime.
#[derive(Debug, Clone)]
pub struct BlockTree {
    nodes: Vec<TreeNode>,
}

impl BlockTree {
    /// Create a tree holding only a genesis block.
    pub fn with_genesis(time: i64, bits: CompactTarget) -> Self {
        Self {
            nodes: vec![TreeNode {
                id: 0,
                parent: None,
                skip: None,
                height: 0,
                time,
                bits,
            }],
        }
    }

    /// The genesis node.
    pub fn genesis(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Node by id.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Number of stored nodes across all branches.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child of `parent`. Panics if `parent` is unknown.
    pub fn extend(&mut self, parent: NodeId, time: i64, bits: CompactTarget) -> NodeId {
        let parent_node = &self.nodes[parent];
        let height = parent_node.height + 1;
        let skip = self
            .ancestor(parent_node, skip_height(height))
            .map(|node| node.id);
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            id,
            parent: Some(parent),
            skip,
            height,
            time,
            bits,
        });
        id
    }

    /// Mine one block on `parent` at `time`, with the bits the retarget
    /// rules require.
    pub fn mine(
        &mut self,
        params: &ChainParams,
        parent: NodeId,
        time: i64,
    ) -> Result<NodeId, InvariantViolation> {
        let bits = next_work_required(&*self, Some(&self.nodes[parent]), time, params)?;
        Ok(self.extend(parent, time, bits))
    }

    /// Mine one block per gap on top of `parent`, returning the new tip.
    pub fn mine_gaps(
        &mut self,
        params: &ChainParams,
        parent: NodeId,
        gaps: impl IntoIterator<Item = i64>,
    ) -> Result<NodeId, InvariantViolation> {
        let mut tip = parent;
        for gap in gaps {
            let time = self.nodes[tip].time + gap;
            tip = self.mine(params, tip, time)?;
        }
        Ok(tip)
    }
}

impl ChainIndex for BlockTree {
    type Node = TreeNode;

    fn predecessor<'a>(&'a self, node: &TreeNode) -> Option<&'a TreeNode> {
        node.parent.and_then(|id| self.nodes.get(id))
    }

    fn ancestor<'a>(&'a self, node: &'a TreeNode, height: u32) -> Option<&'a TreeNode> {
        if height > node.height {
            return None;
        }

        let mut walk = node;
        while walk.height > height {
            let skip = walk.skip.and_then(|id| self.nodes.get(id));
            let take_skip = match skip {
                Some(skip) if skip.height == height => true,
                Some(skip) if skip.height > height => {
                    // Only skip if the predecessor's jump would not land closer.
                    let prev_skip = skip_height(walk.height - 1);
                    !(prev_skip + 2 < skip.height && prev_skip >= height)
                }
                _ => false,
            };
            walk = if take_skip {
                skip?
            } else {
                self.predecessor(walk)?
            };
        }
        Some(walk)
    }
}

// Turn the lowest set bit off.
fn invert_lowest_one(n: u32) -> u32 {
    n & n.wrapping_sub(1)
}

/// Height the skip pointer of a block at `height` points to.
pub fn skip_height(height: u32) -> u32 {
    if height < 2 {
        return 0;
    }
    if height & 1 == 1 {
        invert_lowest_one(invert_lowest_one(height - 1)) + 1
    } else {
        invert_lowest_one(height)
    }
}

/// Auxpow double: valid when the header's identity hash matches the one
/// committed by the parent block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAuxPow {
    /// Identity hash the parent coinbase commits to.
    pub committed_hash: Hash256,
    /// Chain id the merkle branch was built for.
    pub chain_id: i32,
    /// Proof-of-work hash of the parent block.
    pub parent_hash: Hash256,
}

impl AuxPowProof for TestAuxPow {
    fn validate(&self, identity_hash: &Hash256, chain_id: i32, _params: &ChainParams) -> bool {
        self.committed_hash == *identity_hash && self.chain_id == chain_id
    }

    fn parent_pow_hash(&self) -> Hash256 {
        self.parent_hash
    }
}

/// Header double with explicit hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestHeader {
    pub version: BlockVersion,
    pub bits: CompactTarget,
    pub time: i64,
    pub pow_hash: Hash256,
    pub identity_hash: Hash256,
    pub auxpow: Option<TestAuxPow>,
}

impl TestHeader {
    /// Non merge-mined header whose own hash is checked.
    pub fn plain(version: i32, bits: CompactTarget, pow_hash: Hash256) -> Self {
        Self {
            version: BlockVersion::from_consensus(version),
            bits,
            time: 1_620_000_000,
            pow_hash,
            identity_hash: pow_hash,
            auxpow: None,
        }
    }

    /// Merge-mined header committed to by a parent block with `parent_hash`.
    pub fn merge_mined(chain_id: i32, bits: CompactTarget, parent_hash: Hash256) -> Self {
        let identity_hash = Hash256([0x5a; 32]);
        Self {
            version: BlockVersion::new(4, chain_id, true),
            bits,
            time: 1_620_000_000,
            // Own hash never meets a real target
            pow_hash: Hash256([0xff; 32]),
            identity_hash,
            auxpow: Some(TestAuxPow {
                committed_hash: identity_hash,
                chain_id,
                parent_hash,
            }),
        }
    }
}

impl BlockHeader for TestHeader {
    type AuxPow = TestAuxPow;

    fn version(&self) -> BlockVersion {
        self.version
    }

    fn bits(&self) -> CompactTarget {
        self.bits
    }

    fn time(&self) -> i64 {
        self.time
    }

    fn pow_hash(&self) -> Hash256 {
        self.pow_hash
    }

    fn identity_hash(&self) -> Hash256 {
        self.identity_hash
    }

    fn auxpow(&self) -> Option<&TestAuxPow> {
        self.auxpow.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits() -> CompactTarget {
        CompactTarget::from_consensus(0x1e0f_ffff)
    }

    fn linear_tree(len: u32) -> (BlockTree, NodeId) {
        let mut tree = BlockTree::with_genesis(0, bits());
        let mut tip = 0;
        for h in 1..len {
            tip = tree.extend(tip, i64::from(h) * 30, bits());
        }
        (tree, tip)
    }

    #[test]
    fn test_skip_heights() {
        assert_eq!(skip_height(0), 0);
        assert_eq!(skip_height(1), 0);
        assert_eq!(skip_height(2), 0);
        assert_eq!(skip_height(8), 0);
        assert_eq!(skip_height(12), 8);
        assert_eq!(skip_height(13), 1);
        assert_eq!(skip_height(14), 12);
        for h in 2..10_000u32 {
            assert!(skip_height(h) < h);
        }
    }

    #[test]
    fn test_ancestor_matches_linear_walk() {
        let (tree, tip) = linear_tree(3_000);
        let tip = tree.get(tip).unwrap();
        for height in (0..3_000).step_by(37) {
            let node = tree.ancestor(tip, height).unwrap();
            assert_eq!(node.height, height);
            assert_eq!(node.time, i64::from(height) * 30);
        }
        assert!(tree.ancestor(tip, 3_000).is_none());
    }

    #[test]
    fn test_forks_resolve_their_own_ancestors() {
        let (mut tree, tip) = linear_tree(100);
        let fork_point = tree.ancestor(tree.get(tip).unwrap(), 60).unwrap().id;

        let mut fork_tip = fork_point;
        for h in 61..120 {
            fork_tip = tree.extend(fork_tip, i64::from(h) * 30 + 7, bits());
        }

        let fork = tree.get(fork_tip).unwrap();
        assert_eq!(tree.ancestor(fork, 70).unwrap().time, 70 * 30 + 7);
        assert_eq!(tree.ancestor(fork, 60).unwrap().id, fork_point);
        assert_eq!(tree.ancestor(tree.get(tip).unwrap(), 70).unwrap().time, 70 * 30);
    }

    #[test]
    fn test_predecessor_of_genesis() {
        let tree = BlockTree::with_genesis(0, bits());
        assert!(tree.predecessor(tree.genesis()).is_none());
        assert_eq!(tree.len(), 1);
    }
}
