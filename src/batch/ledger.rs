use std::path::{Path, PathBuf};

/// Todo/done bookkeeping for one batch.
///
/// The two lists are always disjoint. Every mutation happens under the engine lock, so a
/// reader never sees an image in both lists or, mid-move, in neither.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    todo: Vec<PathBuf>,
    done: Vec<PathBuf>,
}

/// Serialisable copy of a ledger, used to resume an interrupted batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LedgerSnapshot {
    pub todo: Vec<PathBuf>,
    pub done: Vec<PathBuf>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the batch with `sources`; duplicates are dropped, first occurrence wins.
    pub fn seed(&mut self, sources: &[PathBuf]) {
        self.todo.clear();
        self.done.clear();
        for src in sources {
            if !self.todo.contains(src) {
                self.todo.push(src.clone());
            }
        }
    }

    /// Rebuild from a snapshot. Entries listed in both halves count as done.
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new();
        for path in snapshot.done {
            if !ledger.done.contains(&path) {
                ledger.done.push(path);
            }
        }
        for path in snapshot.todo {
            if !ledger.done.contains(&path) && !ledger.todo.contains(&path) {
                ledger.todo.push(path);
            }
        }
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            todo: self.todo.clone(),
            done: self.done.clone(),
        }
    }

    /// Move `path` from todo to done. Returns `false` if it was not pending.
    pub fn complete(&mut self, path: &Path) -> bool {
        match self.take_todo(path) {
            Some(p) => {
                self.done.push(p);
                true
            }
            None => false,
        }
    }

    /// Drop a failed image from todo without recording it as done.
    pub fn discard(&mut self, path: &Path) -> bool {
        self.take_todo(path).is_some()
    }

    /// Return every done image to todo, ahead of the still-pending ones.
    pub fn fold_back(&mut self) {
        let mut todo = std::mem::take(&mut self.done);
        todo.append(&mut self.todo);
        self.todo = todo;
    }

    pub fn todo(&self) -> &[PathBuf] {
        &self.todo
    }

    pub fn done(&self) -> &[PathBuf] {
        &self.done
    }

    pub fn todo_count(&self) -> usize {
        self.todo.len()
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    pub fn total(&self) -> usize {
        self.todo.len() + self.done.len()
    }

    pub fn is_finished(&self) -> bool {
        self.todo.is_empty()
    }

    fn take_todo(&mut self, path: &Path) -> Option<PathBuf> {
        let idx = self.todo.iter().position(|p| p == path)?;
        Some(self.todo.remove(idx))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/batch/ledger.rs"]
mod tests;
