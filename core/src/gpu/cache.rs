use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread safe map from a configuration to the native object created for it.
pub struct StateCache<K: Hash + Eq, V> {
  entries: RwLock<HashMap<K, Arc<V>>>
}

impl<K: Hash + Eq + Clone, V> StateCache<K, V> {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(HashMap::new())
    }
  }

  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    self.entries.read().get(key).cloned()
  }

  pub fn get_or_try_create<E, F>(&self, key: &K, create: F) -> Result<Arc<V>, E>
    where F: FnOnce(&K) -> Result<V, E> {
    {
      let lock = self.entries.read();
      if let Some(value) = lock.get(key) {
        return Ok(value.clone());
      }
    }

    let mut lock = self.entries.write();
    // Another thread might have created it while we waited for the write lock.
    if let Some(value) = lock.get(key) {
      return Ok(value.clone());
    }
    let value = Arc::new(create(key)?);
    lock.insert(key.clone(), value.clone());
    Ok(value)
  }

  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  pub fn clear(&self) {
    self.entries.write().clear();
  }

  pub fn values(&self) -> Vec<Arc<V>> {
    self.entries.read().values().cloned().collect()
  }
}

impl<K: Hash + Eq + Clone, V> Default for StateCache<K, V> {
  fn default() -> Self {
    Self::new()
  }
}
