//! Memoized view models.
//!
//! A `Derived` value is rebuilt only when its key changes. Views key
//! on subscription revisions, so a builder runs once per delivered
//! snapshot and never on a plain re-render.

pub struct Derived<K, T> {
    key:    Option<K>,
    value:  Option<T>,
    builds: u64,
}

impl<K: PartialEq, T> Default for Derived<K, T> {
    fn default() -> Self {
        Self { key: None, value: None, builds: 0 }
    }
}

impl<K: PartialEq, T> Derived<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value, rebuilding it first if `key` differs
    /// from the key it was built for.
    pub fn get(&mut self, key: K, build: impl FnOnce() -> T) -> &T {
        let fresh = self.key.as_ref() == Some(&key);
        if !(fresh && self.value.is_some()) {
            self.key = Some(key);
            self.builds += 1;
            self.value = Some(build());
        }
        self.value.as_ref().expect("value was just built")
    }

    /// How many times the builder has run (for tests).
    pub fn builds(&self) -> u64 {
        self.builds
    }
}
