//! Canonicalizing string table.
//!
//! [`CanonicalStrings`] maps character ranges to deduplicated `Arc<str>`
//! instances so that repeated map keys across millions of small documents
//! share one allocation. The table is a chained hash map with power-of-two
//! capacity; rehashing splits each bucket into two by the bit just above the
//! old mask, preserving relative chain order.
//!
//! The table requires `&mut` access for interning and is therefore
//! thread-confined; share interned results across parsers by threading the
//! table through the parser factory.

use std::sync::Arc;

const LOAD_FACTOR: f32 = 0.75;
const INITIAL_CAPACITY: usize = 128;

#[derive(Debug)]
struct LeafNode {
    key: Arc<str>,
    hash: u32,
    next: Option<Box<LeafNode>>,
}

#[derive(Debug)]
pub struct CanonicalStrings {
    data: Vec<Option<Box<LeafNode>>>,
    mask: u32,
    threshold: usize,
    len: usize,
}

/// Hash over a character range, `h = 31*h + c`.
#[inline]
fn hash_chars(chars: &[char]) -> u32 {
    let mut h: u32 = 1;
    for &c in chars {
        h = h.wrapping_mul(31).wrapping_add(c as u32);
    }
    h
}

#[inline]
fn str_eq_chars(s: &str, chars: &[char]) -> bool {
    s.chars().eq(chars.iter().copied())
}

impl CanonicalStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// `capacity` is rounded up to a power of two.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two().max(2);
        Self {
            data: (0..cap).map(|_| None).collect(),
            mask: (cap - 1) as u32,
            threshold: (cap as f32 * LOAD_FACTOR) as usize,
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the canonical instance for the given character range,
    /// inserting a fresh one if no equal string exists.
    pub fn intern(&mut self, chars: &[char]) -> Arc<str> {
        let hash = hash_chars(chars);
        let idx = (hash & self.mask) as usize;
        let mut node = self.data[idx].as_deref();
        while let Some(n) = node {
            if n.hash == hash && str_eq_chars(&n.key, chars) {
                return Arc::clone(&n.key);
            }
            node = n.next.as_deref();
        }
        let key: Arc<str> = chars.iter().collect::<String>().into();
        self.data[idx] = Some(Box::new(LeafNode {
            key: Arc::clone(&key),
            hash,
            next: self.data[idx].take(),
        }));
        self.len += 1;
        self.check_resize();
        key
    }

    /// Interns a string already in `str` form.
    pub fn intern_str(&mut self, s: &str) -> Arc<str> {
        // The chain walk needs per-char comparison either way; go through
        // the range form to keep one insertion path.
        let chars: Vec<char> = s.chars().collect();
        self.intern(&chars)
    }

    fn check_resize(&mut self) {
        if self.len < self.threshold {
            return;
        }
        let old_cap = self.data.len();
        let new_cap = old_cap * 2;
        let mut new_data: Vec<Option<Box<LeafNode>>> = (0..new_cap).map(|_| None).collect();
        for idx in 0..old_cap {
            // Each chain splits into exactly two: entries whose hash has the
            // old-capacity bit clear stay at idx, the rest move to
            // idx + old_cap. Collect in order, relink back-to-front.
            let mut lo = Vec::new();
            let mut hi = Vec::new();
            let mut node = self.data[idx].take();
            while let Some(mut n) = node {
                node = n.next.take();
                if n.hash as usize & old_cap == 0 {
                    lo.push(n);
                } else {
                    hi.push(n);
                }
            }
            for mut n in lo.into_iter().rev() {
                n.next = new_data[idx].take();
                new_data[idx] = Some(n);
            }
            for mut n in hi.into_iter().rev() {
                n.next = new_data[idx + old_cap].take();
                new_data[idx + old_cap] = Some(n);
            }
        }
        self.mask = (new_cap - 1) as u32;
        self.threshold = (new_cap as f32 * LOAD_FACTOR) as usize;
        self.data = new_data;
    }
}

impl Default for CanonicalStrings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ranges_share_one_instance() {
        let mut t = CanonicalStrings::new();
        let chars: Vec<char> = "country".chars().collect();
        let a = t.intern(&chars);
        let b = t.intern(&chars);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn distinct_ranges_distinct_instances() {
        let mut t = CanonicalStrings::new();
        let a = t.intern_str("a");
        let b = t.intern_str("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn survives_rehash() {
        let mut t = CanonicalStrings::with_capacity(2);
        let mut firsts = Vec::new();
        for i in 0..500 {
            firsts.push(t.intern_str(&format!("key-{i}")));
        }
        assert_eq!(t.len(), 500);
        for (i, first) in firsts.iter().enumerate() {
            let again = t.intern_str(&format!("key-{i}"));
            assert!(Arc::ptr_eq(first, &again));
        }
        assert_eq!(t.len(), 500);
    }

    #[test]
    fn hash_collisions_resolved_by_content() {
        // Force everything into one bucket.
        let mut t = CanonicalStrings::with_capacity(2);
        let a = t.intern_str("ab");
        let c = t.intern_str("cd");
        assert_ne!(a.as_ref(), c.as_ref());
        assert!(Arc::ptr_eq(&a, &t.intern_str("ab")));
    }
}
