use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};

use itertools::Itertools;
use log::debug;

use crate::bitset::BitSet;
use crate::parser::{thompson, ParserError};
use crate::utils::{caret_escape, Anchor, ALPHABET_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    pub set: BitSet,
    pub complement: bool,
}

impl CharClass {
    pub fn new() -> CharClass {
        CharClass {
            set: BitSet::byte_class(),
            complement: false,
        }
    }

    #[inline]
    pub fn matches(&self, byte: u8) -> bool {
        self.complement != self.set.contains(byte as usize)
    }
}

impl Default for CharClass {
    fn default() -> Self {
        CharClass::new()
    }
}

impl Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if self.complement {
            write!(f, "^")?;
        }
        for byte in self.set.iter() {
            write!(f, "{}", caret_escape(byte as u8))?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    Epsilon,
    Literal(u8),
    Class(CharClass),
}

impl Edge {
    #[inline]
    pub fn matches(&self, byte: u8) -> bool {
        match self {
            Edge::Epsilon => false,
            Edge::Literal(literal) => *literal == byte,
            Edge::Class(class) => class.matches(byte),
        }
    }
}

/// One Thompson-construction state.
///
/// `next[0]` absent marks an accepting node. Both outgoing references are
/// followed on an epsilon edge; only `next[0]` is followed on a byte edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaNode {
    pub next: [Option<usize>; 2],
    pub edge: Edge,
    pub anchor: Anchor,
    pub index: usize,
}

impl NfaNode {
    fn new(index: usize) -> NfaNode {
        NfaNode {
            next: [None, None],
            edge: Edge::Epsilon,
            anchor: Anchor::NONE,
            index,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next[0].is_none()
    }
}

/// Node storage used while a pattern is being parsed.
///
/// Released slots become tombstones and are handed out again by the next
/// [`NfaArena::alloc`]. [`NfaArena::finish`] compacts the surviving nodes so
/// that their indices are dense.
#[derive(Debug, Default)]
pub struct NfaArena {
    slots: Vec<Option<NfaNode>>,
    free: Vec<usize>,
    reused: usize,
}

impl NfaArena {
    pub fn new() -> NfaArena {
        NfaArena::default()
    }

    pub fn alloc(&mut self) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(NfaNode::new(index));
                self.reused += 1;
                index
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Some(NfaNode::new(index)));
                index
            }
        }
    }

    pub fn discard(&mut self, index: usize) {
        if self.slots[index].take().is_some() {
            self.free.push(index);
        }
    }

    /// Merges the contents of node `from` into node `into` and releases
    /// `from`. Whatever pointed at `into` now reaches what `from` did.
    pub fn splice(&mut self, into: usize, from: usize) {
        let source = match self.slots[from].take() {
            Some(node) => node,
            None => panic!("splicing from released NFA slot {}", from),
        };
        self.free.push(from);
        let target = &mut self[into];
        target.next = source.next;
        target.edge = source.edge;
        target.anchor = source.anchor;
    }

    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Consumes the arena and renumbers the live nodes densely.
    pub fn finish(self, start: usize) -> Nfa {
        let mut remap = vec![None; self.slots.len()];
        for (new, old) in self
            .slots
            .iter()
            .positions(|slot| slot.is_some())
            .enumerate()
        {
            remap[old] = Some(new);
        }
        let renumber = |index: usize| match remap[index] {
            Some(index) => index,
            None => panic!("NFA edge points at released slot {}", index),
        };

        let nodes: Vec<NfaNode> = self
            .slots
            .into_iter()
            .flatten()
            .map(|mut node| {
                node.index = renumber(node.index);
                node.next = [node.next[0].map(renumber), node.next[1].map(renumber)];
                node
            })
            .collect();

        debug!(
            "built NFA with {} states ({} slots, {} reused after splicing)",
            nodes.len(),
            remap.len(),
            self.reused
        );

        Nfa {
            start: renumber(start),
            nodes,
        }
    }
}

impl Index<usize> for NfaArena {
    type Output = NfaNode;

    fn index(&self, index: usize) -> &NfaNode {
        match &self.slots[index] {
            Some(node) => node,
            None => panic!("NFA slot {} was released", index),
        }
    }
}

impl IndexMut<usize> for NfaArena {
    fn index_mut(&mut self, index: usize) -> &mut NfaNode {
        match &mut self.slots[index] {
            Some(node) => node,
            None => panic!("NFA slot {} was released", index),
        }
    }
}

/// A finished automaton. Node `i` lives at position `i`.
#[derive(Debug, Clone)]
pub struct Nfa {
    nodes: Vec<NfaNode>,
    start: usize,
}

impl Nfa {
    pub fn new(pattern: &str) -> Result<Nfa, ParserError> {
        thompson(pattern)
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NfaNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, index: usize) -> &NfaNode {
        &self.nodes[index]
    }

    pub fn state_set(&self) -> BitSet {
        BitSet::new(self.nodes.len())
    }

    pub fn anchor(&self) -> Anchor {
        self.nodes
            .iter()
            .filter(|node| node.is_terminal())
            .fold(Anchor::NONE, |anchor, node| anchor | node.anchor)
    }

    /// Grows `states` with everything reachable over epsilon edges.
    pub fn close(&self, states: &mut BitSet) {
        let mut stack: Vec<usize> = states.iter().collect();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.edge != Edge::Epsilon {
                continue;
            }
            for next in node.next.iter().flatten() {
                if !states.contains(*next) {
                    states.insert(*next);
                    stack.push(*next);
                }
            }
        }
    }

    /// States reached from `states` by consuming `byte`, or `None` when no
    /// state has a matching edge.
    pub fn step(&self, states: &BitSet, byte: u8) -> Option<BitSet> {
        let mut out: Option<BitSet> = None;
        for index in states.iter() {
            let node = &self.nodes[index];
            if !node.edge.matches(byte) {
                continue;
            }
            if let Some(next) = node.next[0] {
                out.get_or_insert_with(|| self.state_set()).insert(next);
            }
        }
        out
    }

    pub fn is_accepting(&self, states: &BitSet) -> bool {
        states.iter().any(|index| self.nodes[index].is_terminal())
    }

    pub fn is_match(&self, input: &[u8]) -> bool {
        let mut states = self.state_set();
        states.insert(self.start);
        self.close(&mut states);
        for byte in input {
            if *byte as usize >= ALPHABET_SIZE {
                return false;
            }
            match self.step(&states, *byte) {
                Some(mut next) => {
                    self.close(&mut next);
                    states = next;
                }
                None => return false,
            }
        }
        self.is_accepting(&states)
    }
}

impl Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.nodes.iter() {
            write!(f, "NFA state {:02}: ", node.index)?;
            match node.next {
                [None, _] => write!(f, "(TERMINAL)")?,
                [Some(next), other] => {
                    write!(f, "--> {:02} ", next)?;
                    match other {
                        Some(other) => write!(f, "({:02}) on ", other)?,
                        None => write!(f, "(-1) on ")?,
                    }
                    match &node.edge {
                        Edge::Epsilon => write!(f, "EPSILON ")?,
                        Edge::Literal(byte) => write!(f, "'{}'", caret_escape(*byte))?,
                        Edge::Class(class) => write!(f, "{}", class)?,
                    }
                }
            }
            if !node.anchor.is_empty() {
                write!(f, " {:?}", node.anchor)?;
            }
            if node.index == self.start {
                write!(f, " (START STATE)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_reuses_released_slots() {
        let mut arena = NfaArena::new();
        let a = arena.alloc();
        let b = arena.alloc();
        let c = arena.alloc();
        assert_eq!((a, b, c), (0, 1, 2));
        arena.discard(b);
        assert_eq!(arena.live(), 2);
        assert_eq!(arena.alloc(), b);
        assert_eq!(arena[b].index, b);
        assert_eq!(arena.slots(), 3);
    }

    #[test]
    fn test_splice_moves_contents() {
        let mut arena = NfaArena::new();
        let left = arena.alloc();
        let right = arena.alloc();
        let target = arena.alloc();
        arena[right].edge = Edge::Literal(b'x');
        arena[right].next[0] = Some(target);
        arena.splice(left, right);
        assert_eq!(arena[left].edge, Edge::Literal(b'x'));
        assert_eq!(arena[left].next, [Some(target), None]);
        assert_eq!(arena[left].index, left);
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn test_finish_renumbers_densely() {
        let mut arena = NfaArena::new();
        let start = arena.alloc();
        let dropped = arena.alloc();
        let end = arena.alloc();
        arena[start].edge = Edge::Literal(b'a');
        arena[start].next[0] = Some(end);
        arena.discard(dropped);
        let nfa = arena.finish(start);
        assert_eq!(nfa.len(), 2);
        assert_eq!(nfa.node(0).next, [Some(1), None]);
        assert_eq!(nfa.node(1).index, 1);
        assert!(nfa.node(1).is_terminal());
        assert!(nfa.is_match(b"a"));
        assert!(!nfa.is_match(b"b"));
        assert!(!nfa.is_match(b""));
    }

    #[test]
    #[should_panic]
    fn test_released_slot_is_a_tombstone() {
        let mut arena = NfaArena::new();
        let node = arena.alloc();
        arena.discard(node);
        let _ = &arena[node];
    }

    #[test]
    fn test_char_class_complement() {
        let mut class = CharClass::new();
        class.set.insert(b'\n' as usize);
        assert!(class.matches(b'\n'));
        assert!(!class.matches(b'a'));
        class.complement = true;
        assert!(!class.matches(b'\n'));
        assert!(class.matches(b'a'));
        assert_eq!(class.to_string(), "[^^J]");
    }

    #[test]
    fn test_dump() {
        let nfa = Nfa::new("ab").unwrap();
        let dump = nfa.to_string();
        assert_eq!(dump.lines().count(), nfa.len());
        assert!(dump.contains("(START STATE)"));
        assert!(dump.contains("(TERMINAL)"));
        assert!(dump.contains("'a'"));
    }
}
