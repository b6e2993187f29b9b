//! Ordered Merkle root over transaction header hashes.

use crate::crypto::Hash;
use sha2::{Digest, Sha256};

/// Root of an ordered hash list, or `None` for an empty list.
///
/// A single leaf is its own root. An even level is folded pairwise into
/// `sha256(left ++ right)` and reduced recursively. An odd level longer
/// than one combines the root of its leading even run with the final leaf.
/// Pair order is preserved throughout, so the root commits to the exact
/// leaf order.
pub fn merkle_root(hashes: &[Hash]) -> Option<Hash> {
    match hashes.len() {
        0 => None,
        1 => Some(hashes[0]),
        n if n % 2 == 1 => {
            let left = merkle_root(&hashes[..n - 1])?;
            Some(combine(&left, &hashes[n - 1]))
        }
        _ => {
            let mut level = Vec::with_capacity(hashes.len() / 2);
            for pair in hashes.chunks(2) {
                level.push(combine(&pair[0], &pair[1]));
            }
            merkle_root(&level)
        }
    }
}

fn combine(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
