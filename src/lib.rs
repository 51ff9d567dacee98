//! Compiles line-oriented regular expressions into DFA transition tables.
//!
//! A pattern is parsed straight into a Thompson NFA, turned into a DFA by
//! subset construction and then minimized. The [`emit`] module renders the
//! result as a graph or as tables ready to be pasted into a scanner.

pub mod bitset;
pub mod dfa;
pub mod emit;
pub mod lexer;
pub mod minimize;
pub mod nfa;
pub mod parser;
pub mod utils;

use log::debug;

pub use crate::dfa::Dfa;
pub use crate::emit::{PairsOptions, TableFormat, TableOptions};
pub use crate::nfa::Nfa;
pub use crate::parser::ParserError;
pub use crate::utils::Anchor;

/// Parses `pattern` and returns its minimal DFA.
pub fn compile(pattern: &str) -> Result<Dfa, ParserError> {
    let nfa = Nfa::new(pattern)?;
    let dfa = Dfa::from_nfa(&nfa);
    let minimized = dfa.minimize();
    debug!(
        "{:?}: {} NFA states, {} DFA states, {} after minimization",
        pattern,
        nfa.len(),
        dfa.len(),
        minimized.len()
    );
    Ok(minimized)
}
