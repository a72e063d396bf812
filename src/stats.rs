use ahash::AHashMap;

/// Running summary of every value seen for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl Aggregate {
    pub fn new(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    #[inline]
    pub fn add(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }

    /// Folds another summary of the same key into this one.
    pub fn merge(&mut self, other: &Aggregate) {
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Per-key aggregates with owned keys.
///
/// Lookups take borrowed bytes, so a key is only copied out of the input the
/// first time it is seen.
#[derive(Debug, Default, Clone)]
pub struct AggregateTable {
    entries: AHashMap<Box<[u8]>, Aggregate>,
}

const EXPECTED_KEYS: usize = 512;

impl AggregateTable {
    pub fn new() -> Self {
        Self {
            entries: AHashMap::with_capacity(EXPECTED_KEYS),
        }
    }

    #[inline]
    pub fn record(&mut self, key: &[u8], value: f64) {
        match self.entries.get_mut(key) {
            Some(aggregate) => aggregate.add(value),
            None => {
                self.entries.insert(key.into(), Aggregate::new(value));
            }
        }
    }

    pub fn merge_entry(&mut self, key: Box<[u8]>, aggregate: Aggregate) {
        match self.entries.get_mut(&key) {
            Some(existing) => existing.merge(&aggregate),
            None => {
                self.entries.insert(key, aggregate);
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Aggregate> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Aggregate)> {
        self.entries.iter().map(|(key, agg)| (&**key, agg))
    }

    /// Entries in ascending byte order of their keys.
    pub fn sorted(&self) -> Vec<(&[u8], &Aggregate)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl IntoIterator for AggregateTable {
    type Item = (Box<[u8]>, Aggregate);
    type IntoIter = std::collections::hash_map::IntoIter<Box<[u8]>, Aggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
