//! Growable bitset keyed by action ordinal.

use serde::{Deserialize, Serialize};
use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// Ordinal id of an action within its owner. Ids start at 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ActionId(pub(crate) usize);

impl ActionId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Bit position of this action in an [`ActionBits`] set.
    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One bit per action: "this action is currently in state X".
///
/// An owner keeps one `ActionBits` per state; "is any action pending" is
/// then a single emptiness check.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionBits {
    words: Vec<u64>,
}

impl ActionBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with the bit of `id` set to `value`.
    pub fn with(&self, id: ActionId, value: bool) -> Self {
        let mut next = self.clone();
        next.set(id, value);
        next
    }

    /// Set or clear the bit of `id`. Trailing zero words are trimmed so
    /// equal sets always compare equal.
    pub fn set(&mut self, id: ActionId, value: bool) {
        let (word, bit) = (id.0 / WORD_BITS, id.0 % WORD_BITS);
        if value {
            if self.words.len() <= word {
                self.words.resize(word + 1, 0);
            }
            self.words[word] |= 1u64 << bit;
        } else if let Some(slot) = self.words.get_mut(word) {
            *slot &= !(1u64 << bit);
            while self.words.last() == Some(&0) {
                self.words.pop();
            }
        }
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.words
            .get(id.0 / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (id.0 % WORD_BITS)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Ids whose bit is set, ascending.
    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            (0..WORD_BITS)
                .filter(move |bit| *word & (1u64 << bit) != 0)
                .map(move |bit| ActionId(index * WORD_BITS + bit))
        })
    }
}

impl fmt::Debug for ActionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids().map(|id| id.0)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_bits() {
        let bits = ActionBits::new();
        assert!(bits.is_empty());
        assert_eq!(bits.len(), 0);
        assert!(!bits.contains(ActionId(1)));
    }

    #[test]
    fn set_and_clear_bits() {
        let mut bits = ActionBits::new();
        bits.set(ActionId(1), true);
        bits.set(ActionId(3), true);
        assert!(bits.contains(ActionId(1)));
        assert!(!bits.contains(ActionId(2)));
        assert_eq!(bits.len(), 2);

        bits.set(ActionId(1), false);
        assert!(!bits.contains(ActionId(1)));
        assert_eq!(bits.ids().collect::<Vec<_>>(), vec![ActionId(3)]);
    }

    #[test]
    fn grows_past_one_word() {
        let bits = ActionBits::new().with(ActionId(130), true);
        assert!(bits.contains(ActionId(130)));
        assert_eq!(bits.len(), 1);
    }

    #[test]
    fn clearing_trims_so_sets_compare_equal() {
        let bits = ActionBits::new()
            .with(ActionId(200), true)
            .with(ActionId(200), false);
        assert_eq!(bits, ActionBits::new());
        assert!(bits.is_empty());
    }

    #[test]
    fn clearing_missing_bit_is_noop() {
        let bits = ActionBits::new().with(ActionId(5), false);
        assert!(bits.is_empty());
    }
}
