//! Traversal of the bundle graph.

use std::{collections::HashSet, sync::Arc};

use crate::asset::{Asset, AssetId, Bundle, BundleId};

#[derive(Debug, Default)]
struct AssetCollector {
    assets: Vec<Arc<Asset>>,
    asset_ids: HashSet<AssetId>,
    visited_bundles: HashSet<BundleId>,
}

impl AssetCollector {
    fn visit(&mut self, bundle: &Bundle) {
        if !self.visited_bundles.insert(bundle.id()) {
            return;
        }

        for asset in bundle.assets() {
            if self.asset_ids.insert(asset.id()) {
                self.assets.push(asset.clone());
            }
        }

        for child in bundle.child_bundles() {
            let entry_collected = child
                .entry_asset()
                .is_some_and(|entry| self.asset_ids.contains(&entry.id()));
            if !entry_collected {
                self.visit(&child);
            }
        }
    }
}

/// Collects all assets reachable from `root`, depth-first and in the traversal order.
///
/// Each asset is returned once. A child bundle is not entered if its entry asset has already
/// been collected, or if the bundle itself was already visited.
pub fn collect_all_assets(root: &Bundle) -> Vec<Arc<Asset>> {
    let mut collector = AssetCollector::default();
    collector.visit(root);
    log::debug!(
        "Collected {} assets from {} bundles",
        collector.assets.len(),
        collector.visited_bundles.len()
    );
    collector.assets
}
