//! Small helpers shared by the analysis crates.

use std::collections::HashMap;
use std::hash::Hash;

/// A map whose lookup never fails: missing keys are filled from a constructor.
pub struct DefaultMap<'a, K, V> {
    entries: HashMap<K, V>,
    make: Box<dyn FnMut(&K) -> V + 'a>,
}

impl<'a, K: Eq + Hash + Clone, V> DefaultMap<'a, K, V> {
    pub fn with_default(make: impl FnMut(&K) -> V + 'a) -> Self {
        Self {
            entries: HashMap::new(),
            make: Box::new(make),
        }
    }

    /// Value for `key`, constructing and remembering it on first access.
    pub fn get(&mut self, key: &K) -> &mut V {
        let make = &mut self.make;
        self.entries.entry(key.clone()).or_insert_with(|| make(key))
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Lookup without constructing.
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An endless counter: `from`, `from + by`, `from + 2 * by`, ...
pub fn count(from: i64, by: i64) -> impl FnMut() -> i64 {
    let mut current = from;
    move || {
        let r = current;
        current += by;
        r
    }
}

/// `compose(f, h)()` is `h(f())`.
pub fn compose<B, C>(mut f: impl FnMut() -> B, mut h: impl FnMut(B) -> C) -> impl FnMut() -> C {
    move || h(f())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_constructs_once_per_key() {
        let mut made = 0;
        {
            let mut m: DefaultMap<String, String> = DefaultMap::with_default(|k: &String| {
                made += 1;
                format!("v({k})")
            });
            assert_eq!(m.lookup(&"a".to_string()), None);
            assert_eq!(m.get(&"a".to_string()).as_str(), "v(a)");
            assert_eq!(m.get(&"a".to_string()).as_str(), "v(a)");
            m.get(&"b".to_string()).push('!');
            assert_eq!(m.lookup(&"b".to_string()).map(String::as_str), Some("v(b)!"));
            assert_eq!(m.len(), 2);
        }
        assert_eq!(made, 2);
    }

    #[test]
    fn insert_overrides_the_default() {
        let mut m: DefaultMap<u32, u32> = DefaultMap::with_default(|k: &u32| k * 10);
        m.insert(1, 7);
        assert_eq!(*m.get(&1), 7);
        assert_eq!(*m.get(&2), 20);
    }

    #[test]
    fn count_steps() {
        let mut c = count(3, 2);
        assert_eq!((c(), c(), c()), (3, 5, 7));
    }

    #[test]
    fn compose_feeds_results_forward() {
        let mut names = compose(count(0, 1), |n| format!("tmp{n}"));
        assert_eq!(names(), "tmp0");
        assert_eq!(names(), "tmp1");
    }
}
