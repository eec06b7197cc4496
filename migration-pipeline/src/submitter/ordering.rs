use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, PoisonError};

/// Creators an unconfirmed request window may have left a gap for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Blocker {
    Creators(BTreeSet<String>),
    /// The page was never read, so any creator may be affected.
    Unknown,
}

impl Blocker {
    fn blocks(&self, creators: &BTreeSet<String>) -> bool {
        match self {
            Blocker::Unknown => true,
            Blocker::Creators(blocked) => !blocked.is_disjoint(creators),
        }
    }
}

/// Request windows that did not confirm, by offset.
///
/// The destination numbers a creator's requests in the order they arrive, so
/// a later window for the same creator must not land while an earlier one is
/// still missing.
#[derive(Debug, Default)]
pub(crate) struct UnconfirmedWindows {
    windows: Mutex<BTreeMap<usize, Blocker>>,
}

impl UnconfirmedWindows {
    /// Offset of the first earlier window that shares a creator with this one.
    pub(crate) fn blocking(&self, offset: usize, creators: &BTreeSet<String>) -> Option<usize> {
        if creators.is_empty() {
            return None;
        }
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .range(..offset)
            .find(|(_, blocker)| blocker.blocks(creators))
            .map(|(earlier, _)| *earlier)
    }

    pub(crate) fn confirm(&self, offset: usize) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&offset);
    }

    pub(crate) fn hold(&self, offset: usize, blocker: Blocker) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(offset, blocker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(creators: &[&str]) -> BTreeSet<String> {
        creators.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn earlier_window_with_shared_creator_blocks() {
        let unconfirmed = UnconfirmedWindows::default();
        unconfirmed.hold(10, Blocker::Creators(set(&["0xa", "0xb"])));

        assert_eq!(unconfirmed.blocking(20, &set(&["0xb"])), Some(10));
        assert_eq!(unconfirmed.blocking(20, &set(&["0xc"])), None);
    }

    #[test]
    fn later_windows_never_block_earlier_ones() {
        let unconfirmed = UnconfirmedWindows::default();
        unconfirmed.hold(20, Blocker::Unknown);

        assert_eq!(unconfirmed.blocking(10, &set(&["0xa"])), None);
        assert_eq!(unconfirmed.blocking(20, &set(&["0xa"])), None);
    }

    #[test]
    fn unread_window_blocks_every_creator_until_confirmed() {
        let unconfirmed = UnconfirmedWindows::default();
        unconfirmed.hold(0, Blocker::Unknown);

        assert_eq!(unconfirmed.blocking(10, &set(&["0xz"])), Some(0));

        unconfirmed.confirm(0);
        assert_eq!(unconfirmed.blocking(10, &set(&["0xz"])), None);
    }
}
