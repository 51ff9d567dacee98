use std::fmt::{self, Debug};

use bitvec::order::Lsb0;
use bitvec::vec::BitVec;
use itertools::Itertools;

use crate::utils::ALPHABET_SIZE;

/// A fixed-universe set of small integers.
///
/// The same type labels character-class edges (members are bytes) and DFA
/// states (members are dense NFA state indices). The universe is fixed when
/// the set is created; every set that takes part in a comparison must have
/// been created with the same capacity.
#[derive(Clone, Default)]
pub struct BitSet {
    bits: BitVec<usize, Lsb0>,
}

impl BitSet {
    pub fn new(capacity: usize) -> BitSet {
        BitSet {
            bits: BitVec::repeat(false, capacity),
        }
    }

    pub fn byte_class() -> BitSet {
        BitSet::new(ALPHABET_SIZE)
    }

    pub fn with_members(capacity: usize, members: impl IntoIterator<Item = usize>) -> BitSet {
        let mut set = BitSet::new(capacity);
        for member in members {
            set.insert(member);
        }
        set
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn insert(&mut self, member: usize) {
        assert!(
            member < self.capacity(),
            "{} is outside a set of capacity {}",
            member,
            self.capacity()
        );
        self.bits.set(member, true);
    }

    /// Adds every member of the inclusive range `from..=to`.
    pub fn insert_range(&mut self, from: usize, to: usize) {
        for member in from..=to {
            self.insert(member);
        }
    }

    #[inline]
    pub fn contains(&self, member: usize) -> bool {
        self.bits.get(member).map_or(false, |bit| *bit)
    }

    pub fn union_with(&mut self, other: &BitSet) {
        for member in other.iter() {
            self.insert(member);
        }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn intersection_count(&self, other: &BitSet) -> usize {
        self.iter().filter(|member| other.contains(*member)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        let count = self.count();
        count == other.count() && self.intersection_count(other) == count
    }
}

impl Eq for BitSet {}

impl Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter().join(", "))
    }
}
