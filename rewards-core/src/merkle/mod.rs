//! Merkle Tree Module
//!
//! Distribution trees verified on-chain by the Merkle distributor:
//! - leaf = `keccak256(abi.encodePacked(uint256 accountIndex, address account, uint256 amount))`
//! - node = `keccak256(min(a, b) ++ max(a, b))` (sorted pairs, so a proof is
//!   a bare list of sibling hashes)
//! - an unpaired node at the end of a level is promoted unchanged

use crate::error::{RewardsError, RewardsResult};
use crate::types::{Address, Bytes32};
use bigdecimal::{BigDecimal, Signed};
use num_bigint::Sign;

// ============================================================
// Leaves
// ============================================================

/// One recipient entry of a distribution tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleLeaf {
    pub account_index: u64,
    pub account: Address,
    /// Raw reward-token units
    pub amount: BigDecimal,
}

impl MerkleLeaf {
    pub fn new(account_index: u64, account: Address, amount: BigDecimal) -> Self {
        Self {
            account_index,
            account,
            amount,
        }
    }

    /// Packed ABI encoding: 32 + 20 + 32 bytes
    pub fn encode_packed(&self) -> RewardsResult<Vec<u8>> {
        let mut data = Vec::with_capacity(84);
        data.extend_from_slice(&u256_word(&BigDecimal::from(self.account_index))?);
        data.extend_from_slice(&self.account.to_bytes());
        data.extend_from_slice(&u256_word(&self.amount)?);
        Ok(data)
    }

    /// Leaf hash
    pub fn hash(&self) -> RewardsResult<Bytes32> {
        Ok(Bytes32::keccak256(&self.encode_packed()?))
    }
}

/// Big-endian 32-byte word of a non-negative integer
fn u256_word(value: &BigDecimal) -> RewardsResult<[u8; 32]> {
    let out_of_range = || RewardsError::AmountOutOfRange {
        value: value.to_string(),
    };

    if value.is_negative() || !value.is_integer() {
        return Err(out_of_range());
    }
    let (int, _) = value.with_scale(0).into_bigint_and_exponent();
    let (sign, bytes) = int.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 32 {
        return Err(out_of_range());
    }

    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

// ============================================================
// Tree
// ============================================================

/// Hash two children in sorted order
pub fn hash_pair(a: &Bytes32, b: &Bytes32) -> Bytes32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(lo.as_bytes());
    data[32..].copy_from_slice(hi.as_bytes());
    Bytes32::keccak256(&data)
}

fn next_level(level: &[Bytes32]) -> Vec<Bytes32> {
    level
        .chunks(2)
        .map(|chunk| match chunk {
            [left, right] => hash_pair(left, right),
            // Odd number of nodes: promote the single node
            [single] => *single,
            _ => Bytes32::zero(),
        })
        .collect()
}

/// Merkle tree over precomputed leaf hashes
#[derive(Clone, Debug)]
pub struct MerkleTreeBuilder {
    /// `levels[0]` are the leaves, the last level holds the root
    levels: Vec<Vec<Bytes32>>,
}

impl MerkleTreeBuilder {
    pub fn from_leaves(leaves: Vec<Bytes32>) -> Self {
        let mut levels = vec![leaves];
        while levels.last().map_or(false, |level| level.len() > 1) {
            let next = levels.last().map(|level| next_level(level)).unwrap_or_default();
            levels.push(next);
        }
        Self { levels }
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Root hash; zero for an empty tree
    pub fn root(&self) -> Bytes32 {
        self.levels
            .last()
            .and_then(|level| level.first().copied())
            .unwrap_or_default()
    }

    /// Sibling path for the leaf at `index`
    pub fn proof(&self, index: usize) -> RewardsResult<Vec<Bytes32>> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(RewardsError::LeafIndexOutOfBounds { index, leaf_count });
        }

        let mut path = Vec::new();
        let mut current = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = current ^ 1;
            if let Some(node) = level.get(sibling) {
                path.push(*node);
            }
            current /= 2;
        }
        Ok(path)
    }

    /// Fold a proof from a leaf up to a root
    pub fn compute_root(leaf: &Bytes32, proof: &[Bytes32]) -> Bytes32 {
        proof.iter().fold(*leaf, |acc, node| hash_pair(&acc, node))
    }

    /// Verify an inclusion proof against an expected root
    pub fn verify(root: &Bytes32, leaf: &Bytes32, proof: &[Bytes32]) -> bool {
        Self::compute_root(leaf, proof) == *root
    }
}

// ============================================================
// Window tree
// ============================================================

/// One recipient with its position and proof
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowLeaf {
    pub leaf: MerkleLeaf,
    pub proof: Vec<Bytes32>,
}

/// A fully built distribution tree
#[derive(Clone, Debug)]
pub struct WindowTree {
    pub root: Bytes32,
    pub leaves: Vec<WindowLeaf>,
}

impl WindowTree {
    pub fn total_amount(&self) -> BigDecimal {
        self.leaves
            .iter()
            .fold(BigDecimal::from(0), |acc, l| acc + &l.leaf.amount)
    }
}

/// Build a tree from per-recipient totals.
///
/// Recipients are sorted by canonical address and receive contiguous
/// account indices starting at zero, so the same totals always produce the
/// same root and proofs.
pub fn build_window_tree(mut totals: Vec<(Address, BigDecimal)>) -> RewardsResult<WindowTree> {
    if totals.is_empty() {
        return Err(RewardsError::EmptyWindow);
    }

    totals.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(pair) = totals.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(RewardsError::DuplicateRecipient {
            address: pair[0].0.to_string(),
        });
    }

    let leaves: Vec<MerkleLeaf> = totals
        .into_iter()
        .enumerate()
        .map(|(index, (address, amount))| MerkleLeaf::new(index as u64, address, amount))
        .collect();
    let hashes = leaves
        .iter()
        .map(MerkleLeaf::hash)
        .collect::<RewardsResult<Vec<_>>>()?;

    let tree = MerkleTreeBuilder::from_leaves(hashes);
    let leaves = leaves
        .into_iter()
        .enumerate()
        .map(|(index, leaf)| Ok(WindowLeaf { leaf, proof: tree.proof(index)? }))
        .collect::<RewardsResult<Vec<_>>>()?;

    Ok(WindowTree {
        root: tree.root(),
        leaves,
    })
}
