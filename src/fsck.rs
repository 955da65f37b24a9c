//! Chain integrity checking
//!
//! Verifies that a directory entry and its FAT chain agree: the chain
//! terminates, visits distinct in-range clusters, and holds exactly the
//! number of clusters the recorded size requires.

use std::collections::HashSet;

use crate::blockdev::{BackingStore, Disk};
use crate::dir::FileEntry;
use crate::error::FatError;
use crate::fat::FatTable;

/// Walk and validate the chain behind `entry`, returning it in order.
///
/// A zero first-cluster must pair with a zero size and yields an empty
/// chain. Otherwise the size must land inside the last cluster:
/// `(n - 1) * cluster_size < size <= n * cluster_size`.
pub fn verify_chain<B: BackingStore>(
    fat: &FatTable,
    disk: &mut Disk<B>,
    entry: &FileEntry,
    cluster_size: u32,
) -> Result<Vec<u32>, FatError> {
    if entry.first_cluster == 0 {
        if entry.size != 0 {
            return Err(FatError::BadChain);
        }
        return Ok(Vec::new());
    }
    if entry.size == 0 {
        return Err(FatError::BadChain);
    }

    let mut seen = HashSet::new();
    let mut clusters = Vec::new();
    for step in fat.walk_chain(disk, entry.first_cluster) {
        let cluster = step?;
        if !seen.insert(cluster) {
            return Err(FatError::BadChain);
        }
        clusters.push(cluster);
    }

    let chain_len = clusters.len() as u64;
    let size = entry.size as u64;
    let cluster_size = cluster_size as u64;
    if size > chain_len * cluster_size || size <= (chain_len - 1) * cluster_size {
        return Err(FatError::BadChain);
    }
    Ok(clusters)
}
