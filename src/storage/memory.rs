use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::Result;

use super::KeyValueStore;

/// Process-local store; nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    writes: RefCell<usize>,
}

impl MemoryStore {
    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
