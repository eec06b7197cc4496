use migration_shared::types::EntityKind;

/// Explicit parameters of one migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPlan {
    pub kind: EntityKind,
    /// Expected number of records. Only an upper bound on the windows
    /// attempted; a short page from the indexer ends the run first.
    pub total_count: usize,
    pub batch_size: usize,
    /// First window to submit. Earlier windows are skipped, not checked.
    pub start_window: usize,
}

/// One `(offset, batch_size)` slice of the record range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub index: usize,
    pub offset: usize,
    pub page_size: usize,
    /// Records this window covers within `total_count`.
    pub expected: usize,
}

impl MigrationPlan {
    pub fn new(kind: EntityKind, total_count: usize, batch_size: usize) -> Self {
        Self {
            kind,
            total_count,
            batch_size,
            start_window: 0,
        }
    }

    pub fn starting_at(mut self, start_window: usize) -> Self {
        self.start_window = start_window;
        self
    }

    pub fn window_count(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.batch_size)
    }

    pub fn window(&self, index: usize) -> Option<Window> {
        if index >= self.window_count() {
            return None;
        }
        let offset = index * self.batch_size;
        Some(Window {
            index,
            offset,
            page_size: self.batch_size,
            expected: self.batch_size.min(self.total_count - offset),
        })
    }

    /// Windows to attempt, in ascending order.
    pub fn windows(&self) -> impl Iterator<Item = Window> + '_ {
        (self.start_window..self.window_count()).filter_map(|index| self.window(index))
    }
}
