use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// Outcome of offering an asset URL to the dedup set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAdmission {
    /// First sighting; the caller owns fetching it
    Admitted,

    /// Already enqueued by some page
    Duplicate,

    /// The configured asset cap is exhausted
    CapReached,
}

#[derive(Debug, Default)]
struct Visited {
    pages: HashSet<String>,
    assets: HashSet<String>,
}

/// Deduplication state shared by all workers of one run
///
/// Both sets sit behind a single lock. Every membership change is a
/// test-and-set performed while holding it, and the lock is released before
/// the caller does any network or disk work.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: Mutex<Visited>,
    max_assets: Option<usize>,
}

impl CrawlState {
    /// Creates empty state with an optional cap on distinct assets
    pub fn new(max_assets: Option<usize>) -> Self {
        Self {
            visited: Mutex::new(Visited::default()),
            max_assets,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Visited> {
        // A panicking worker cannot leave the sets half-updated
        self.visited.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks a page as visited; returns true if it was not visited before
    pub fn mark_page(&self, url: &Url) -> bool {
        self.lock().pages.insert(url.as_str().to_string())
    }

    /// Returns true if the page has already been marked
    pub fn has_page(&self, url: &Url) -> bool {
        self.lock().pages.contains(url.as_str())
    }

    /// Marks an asset as enqueued, honouring the asset cap
    pub fn mark_asset(&self, url: &Url) -> AssetAdmission {
        let mut visited = self.lock();
        if visited.assets.contains(url.as_str()) {
            return AssetAdmission::Duplicate;
        }
        if let Some(cap) = self.max_assets {
            if visited.assets.len() >= cap {
                return AssetAdmission::CapReached;
            }
        }
        visited.assets.insert(url.as_str().to_string());
        AssetAdmission::Admitted
    }

    /// Number of distinct pages marked so far
    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    /// Number of distinct assets admitted so far
    pub fn asset_count(&self) -> usize {
        self.lock().assets.len()
    }
}
