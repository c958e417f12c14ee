//! Shared test helpers for retargeting tests.

use crate::chain::{ChainIndex, HeaderFields};
use crate::compact::CompactTarget;

/// A single chain stored by height. Node `i` sits at index `i`.
pub struct LinearChain {
    pub nodes: Vec<HeaderFields>,
}

impl LinearChain {
    /// `len` blocks spaced exactly `spacing` seconds apart, all with `bits`.
    pub fn steady(len: u32, spacing: i64, bits: u32) -> Self {
        let nodes = (0..len)
            .map(|height| HeaderFields {
                height,
                time: 1_400_000_000 + height as i64 * spacing,
                bits: CompactTarget::from_consensus(bits),
            })
            .collect();
        Self { nodes }
    }

    /// Append a block `gap` seconds after the tip.
    pub fn push(&mut self, gap: i64, bits: u32) {
        let (height, time) = match self.nodes.last() {
            Some(tip) => (tip.height + 1, tip.time + gap),
            None => (0, 1_400_000_000),
        };
        self.nodes.push(HeaderFields {
            height,
            time,
            bits: CompactTarget::from_consensus(bits),
        });
    }

    pub fn tip(&self) -> &HeaderFields {
        self.nodes.last().expect("chain is not empty")
    }

    pub fn at(&self, height: u32) -> &HeaderFields {
        &self.nodes[height as usize]
    }
}

impl ChainIndex for LinearChain {
    type Node = HeaderFields;

    fn predecessor<'a>(&'a self, node: &HeaderFields) -> Option<&'a HeaderFields> {
        node.height
            .checked_sub(1)
            .and_then(|h| self.nodes.get(h as usize))
    }
}
