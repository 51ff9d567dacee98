use itertools::Itertools;
use log::{debug, trace};

use crate::dfa::{Dfa, DfaNode, Transition};
use crate::utils::alphabet;

/// Partition refinement over the states of one DFA.
///
/// `partitions[p]` lists the members of partition `p`; every node's
/// `partition` field mirrors which list it is in.
struct Minimizer {
    nodes: Vec<DfaNode>,
    partitions: Vec<Vec<usize>>,
}

impl Minimizer {
    /// Accepting states go first, then the rest. Empty groups are skipped.
    fn new(dfa: &Dfa) -> Minimizer {
        let mut nodes = dfa.nodes().to_vec();
        let (accepting, rest): (Vec<usize>, Vec<usize>) =
            (0..nodes.len()).partition(|index| nodes[*index].accepting);
        let partitions: Vec<Vec<usize>> = [accepting, rest]
            .into_iter()
            .filter(|group| !group.is_empty())
            .collect();
        for (id, members) in partitions.iter().enumerate() {
            for member in members {
                nodes[*member].partition = id;
            }
        }
        Minimizer { nodes, partitions }
    }

    /// Whether some byte sends `a` and `b` to different partitions, or
    /// only one of them has a transition on it.
    fn distinguishable(&self, a: usize, b: usize) -> bool {
        alphabet().any(|byte| {
            match (self.nodes[a].goto(byte), self.nodes[b].goto(byte)) {
                (None, None) => false,
                (Some(x), Some(y)) => self.nodes[x].partition != self.nodes[y].partition,
                _ => true,
            }
        })
    }

    /// Splits partition `p` against its first member. Members that differ
    /// from it move together into one new partition appended to the list,
    /// once the whole partition has been compared.
    fn refine(&mut self, p: usize) -> bool {
        let members = std::mem::take(&mut self.partitions[p]);
        let (reference, others) = match members.split_first() {
            Some((reference, others)) => (*reference, others),
            None => return false,
        };

        let new_id = self.partitions.len();
        let mut kept = vec![reference];
        let mut split = Vec::new();
        for &member in others {
            if self.distinguishable(reference, member) {
                split.push(member);
            } else {
                kept.push(member);
            }
        }

        self.partitions[p] = kept;
        if split.is_empty() {
            return false;
        }
        // Every member is compared under the map as it was before the split.
        for &member in split.iter() {
            self.nodes[member].partition = new_id;
        }
        trace!(
            "partition {} = {} split off {} = {}",
            p,
            self.describe(p),
            new_id,
            split.iter().map(|member| self.nodes[*member].name()).join(" ")
        );
        self.partitions.push(split);
        true
    }

    /// One pass over the partition list. The list grows while it is walked,
    /// so partitions created during the pass are refined in the same pass.
    fn sweep(&mut self) -> usize {
        let mut splits = 0;
        let mut cursor = 0;
        while cursor < self.partitions.len() {
            if self.refine(cursor) {
                splits += 1;
            }
            cursor += 1;
        }
        splits
    }

    /// Sweeps until a whole pass leaves every partition intact.
    fn run(&mut self) {
        let mut passes = 0;
        loop {
            passes += 1;
            let splits = self.sweep();
            debug!(
                "refinement pass {}: {} splits, {} partitions",
                passes,
                splits,
                self.partitions.len()
            );
            if splits == 0 {
                break;
            }
        }
    }

    fn describe(&self, p: usize) -> String {
        self.partitions[p]
            .iter()
            .map(|member| self.nodes[*member].name())
            .join(" ")
    }

    /// Builds one node per partition. Quotient nodes are ordered by the
    /// smallest member of their partition, which keeps the start state at 0.
    fn quotient(self) -> Dfa {
        let order: Vec<usize> = (0..self.partitions.len())
            .sorted_by_key(|p| self.partitions[*p].iter().min().copied())
            .collect();
        let mut renumber = vec![0; self.partitions.len()];
        for (index, p) in order.iter().enumerate() {
            renumber[*p] = index;
        }

        let nodes = order
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let representative = &self.nodes[self.partitions[*p][0]];
                let mut node = DfaNode::new(representative.label.clone(), representative.accepting);
                node.id = index;
                node.index = index;
                node.partition = *p;
                for transition in representative.transitions.iter() {
                    let target = renumber[self.nodes[transition.target].partition];
                    match node
                        .transitions
                        .iter_mut()
                        .find(|existing| existing.target == target)
                    {
                        Some(existing) => existing.bytes.union_with(&transition.bytes),
                        None => node.transitions.push(Transition {
                            target,
                            bytes: transition.bytes.clone(),
                        }),
                    }
                }
                node
            })
            .collect();
        Dfa::from_nodes(nodes)
    }
}

impl Dfa {
    /// Merges indistinguishable states into a new, equivalent automaton.
    pub fn minimize(&self) -> Dfa {
        if self.is_empty() {
            return self.clone();
        }
        let mut minimizer = Minimizer::new(self);
        minimizer.run();
        let minimized = minimizer.quotient();
        debug!("minimized {} DFA states to {}", self.len(), minimized.len());
        minimized
    }
}
