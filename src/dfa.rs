use itertools::Itertools;
use log::{debug, trace};

use crate::bitset::BitSet;
use crate::nfa::Nfa;
use crate::utils::{alphabet, state_name, ALPHABET_SIZE};

/// An edge group: every byte in `bytes` leads to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: usize,
    pub bytes: BitSet,
}

impl Transition {
    pub fn new(target: usize, byte: u8) -> Self {
        let mut bytes = BitSet::byte_class();
        bytes.insert(byte as usize);
        Self { target, bytes }
    }
}

/// One subset-construction state.
#[derive(Debug, Clone)]
pub struct DfaNode {
    /// The NFA states this node stands for. Two nodes with equal labels are
    /// the same node.
    pub label: BitSet,
    pub id: usize,
    pub transitions: Vec<Transition>,
    /// Scratch field for the minimizer.
    pub partition: usize,
    pub index: usize,
    pub accepting: bool,
}

impl DfaNode {
    pub(crate) fn new(label: BitSet, accepting: bool) -> DfaNode {
        DfaNode {
            label,
            id: 0,
            transitions: Vec::new(),
            partition: 0,
            index: 0,
            accepting,
        }
    }

    pub fn name(&self) -> String {
        state_name(self.id)
    }

    pub fn goto(&self, byte: u8) -> Option<usize> {
        self.transitions
            .iter()
            .find(|transition| transition.bytes.contains(byte as usize))
            .map(|transition| transition.target)
    }

    /// True when no transition leaves this node. Accepting nodes of rules
    /// that end in `$` look like this.
    pub fn is_dead_end(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Records `byte -> target`, folding it into an existing edge group to
    /// the same target.
    pub(crate) fn add_transition(&mut self, target: usize, byte: u8) {
        match self
            .transitions
            .iter_mut()
            .find(|transition| transition.target == target)
        {
            Some(transition) => transition.bytes.insert(byte as usize),
            None => self.transitions.push(Transition::new(target, byte)),
        }
    }

    pub fn transition_count(&self) -> usize {
        self.transitions
            .iter()
            .map(|transition| transition.bytes.count())
            .sum()
    }
}

/// Closes `states` over epsilon edges and wraps the result in a new node.
pub fn epsilon_closure(nfa: &Nfa, mut states: BitSet) -> DfaNode {
    nfa.close(&mut states);
    let accepting = nfa.is_accepting(&states);
    DfaNode::new(states, accepting)
}

/// States reachable from `states` on `byte`; `None` is a dead transition.
pub fn move_on(nfa: &Nfa, states: &BitSet, byte: u8) -> Option<BitSet> {
    nfa.step(states, byte)
}

/// A deterministic automaton whose start state is node 0.
#[derive(Debug, Clone)]
pub struct Dfa {
    nodes: Vec<DfaNode>,
}

impl Dfa {
    pub(crate) fn from_nodes(nodes: Vec<DfaNode>) -> Dfa {
        Dfa { nodes }
    }

    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let mut initial = nfa.state_set();
        initial.insert(nfa.start());
        let mut nodes = vec![epsilon_closure(nfa, initial)];
        let mut work = vec![0];

        while let Some(current) = work.pop() {
            for byte in alphabet() {
                let moved = match move_on(nfa, &nodes[current].label, byte) {
                    Some(moved) => moved,
                    None => continue,
                };
                let mut candidate = epsilon_closure(nfa, moved);
                let target = match nodes.iter().position(|node| node.label == candidate.label) {
                    Some(existing) => existing,
                    None => {
                        candidate.id = nodes.len();
                        trace!(
                            "DFA state {} = {:?}{}",
                            candidate.name(),
                            candidate.label,
                            if candidate.accepting { " (accepting)" } else { "" }
                        );
                        nodes.push(candidate);
                        work.push(nodes.len() - 1);
                        nodes.len() - 1
                    }
                };
                nodes[current].add_transition(target, byte);
            }
        }

        for (index, node) in nodes.iter_mut().enumerate() {
            node.index = index;
        }
        debug!("subset construction produced {} DFA states", nodes.len());
        Dfa { nodes }
    }

    #[inline]
    pub fn start(&self) -> usize {
        0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DfaNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, index: usize) -> &DfaNode {
        &self.nodes[index]
    }

    pub fn next_state(&self, state: usize, byte: u8) -> Option<usize> {
        self.nodes[state].goto(byte)
    }

    pub fn accepts(&self, input: &[u8]) -> bool {
        let mut state = self.start();
        for byte in input {
            if *byte as usize >= ALPHABET_SIZE {
                return false;
            }
            state = match self.next_state(state, *byte) {
                Some(next) => next,
                None => return false,
            };
        }
        self.nodes[state].accepting
    }

    pub fn accepting_states(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .positions(|node| node.accepting)
            .collect()
    }
}
