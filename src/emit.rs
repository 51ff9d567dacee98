//! Textual renderings of a [`Dfa`]: a directed graph for inspection, and
//! transition tables meant to be pasted into a scanner's source.
//!
//! Every table uses the same state numbering. Row 0 is the dead state and
//! has no transitions; DFA node `i` is row `i + 1`. A cell holds the row of
//! the next state, or 0 when there is no transition.

use std::fmt::{self, Display};

use itertools::Itertools;
use log::debug;

use crate::dfa::Dfa;
use crate::utils::{alphabet, caret_escape, state_name, ALPHABET_SIZE};

/// Cells (or pairs) per line in the compressed tables.
const NCOLS: usize = 10;
const INDENT: &str = "          ";
const TYPE: &str = "YY_TTYPE";
const STORAGE_CLASS: &str = "YYPRIVATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    #[default]
    C,
    Rust,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub name: String,
    pub format: TableFormat,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            name: String::from("Yy_nxt"),
            format: TableFormat::C,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairsOptions {
    pub name: String,
    /// Rows with more transitions than this are emitted uncompressed.
    pub threshold: usize,
    /// Print bytes as numbers instead of character literals.
    pub numbers: bool,
}

impl Default for PairsOptions {
    fn default() -> Self {
        PairsOptions {
            name: String::from("Yy_nxt"),
            threshold: 4,
            numbers: false,
        }
    }
}

/// `table[row][byte]`, including the leading dead row.
pub fn transition_matrix(dfa: &Dfa) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0; ALPHABET_SIZE]; dfa.len() + 1];
    for (node, row) in dfa.nodes().iter().zip(table.iter_mut().skip(1)) {
        for transition in node.transitions.iter() {
            for byte in transition.bytes.iter() {
                row[byte] = transition.target + 1;
            }
        }
    }
    table
}

fn escape_label(byte: u8) -> String {
    match byte {
        b'\'' | b'"' | b'\\' => format!("\\{}", byte as char),
        _ => caret_escape(byte),
    }
}

pub struct Graph<'a> {
    dfa: &'a Dfa,
    name: &'a str,
}

/// One `SRC -> DST` line per edge group, in node order.
pub fn graph<'a>(dfa: &'a Dfa, name: &'a str) -> Graph<'a> {
    Graph { dfa, name }
}

impl Display for Graph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", self.name)?;
        for node in self.dfa.nodes() {
            for transition in node.transitions.iter() {
                let label: String = transition
                    .bytes
                    .iter()
                    .map(|byte| escape_label(byte as u8))
                    .collect();
                writeln!(
                    f,
                    "{} -> {} [ label = \"'{}'\" ]",
                    node.name(),
                    state_name(self.dfa.node(transition.target).id),
                    label
                )?;
            }
        }
        writeln!(f, "}}")
    }
}

pub struct Table<'a> {
    matrix: Vec<Vec<usize>>,
    options: &'a TableOptions,
}

pub fn table<'a>(dfa: &Dfa, options: &'a TableOptions) -> Table<'a> {
    Table {
        matrix: transition_matrix(dfa),
        options,
    }
}

impl Table<'_> {
    fn rows(&self, f: &mut fmt::Formatter<'_>, open: &str, close: &str) -> fmt::Result {
        for (row, cells) in self.matrix.iter().enumerate() {
            writeln!(
                f,
                "/* {:05} */ {} {}{},",
                row,
                open,
                cells.iter().map(|cell| format!("{:5}, ", cell)).join(""),
                close
            )?;
        }
        Ok(())
    }
}

impl Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.options.name;
        match self.options.format {
            TableFormat::C => {
                writeln!(
                    f,
                    "// yy_next(state, c) is given the current state and next character,"
                )?;
                writeln!(f, "// and evaluates to the next state.")?;
                writeln!(f, "#define yy_next(state, c)    {}[state][c]", name)?;
                writeln!(f, "static const int {}[][{}] = {{", name, ALPHABET_SIZE)?;
                self.rows(f, "{", "}")?;
                writeln!(f, "}};")
            }
            TableFormat::Rust => {
                writeln!(
                    f,
                    "/// `yy_next(state, c)` is given the current state and next character,"
                )?;
                writeln!(f, "/// and evaluates to the next state.")?;
                writeln!(f, "#[inline]")?;
                writeln!(f, "pub const fn yy_next(state: usize, c: u8) -> u16 {{")?;
                writeln!(f, "    {}[state][c as usize]", name)?;
                writeln!(f, "}}")?;
                writeln!(f)?;
                writeln!(f, "#[rustfmt::skip]")?;
                writeln!(
                    f,
                    "pub static {}: [[u16; {}]; {}] = [",
                    name,
                    ALPHABET_SIZE,
                    self.matrix.len()
                )?;
                self.rows(f, "[", "]")?;
                writeln!(f, "];")
            }
        }
    }
}

pub struct Pairs<'a> {
    matrix: Vec<Vec<usize>>,
    options: &'a PairsOptions,
}

/// The compressed table.
///
/// A row with more than `threshold` transitions is stored dense: a leading
/// 0 followed by every cell. Any other row is stored as its transition count
/// followed by `byte, next` pairs. Rows without transitions, including the
/// dead row, are `NULL` in the pointer array.
pub fn pairs<'a>(dfa: &Dfa, options: &'a PairsOptions) -> Pairs<'a> {
    Pairs {
        matrix: transition_matrix(dfa),
        options,
    }
}

impl Pairs<'_> {
    /// The entries stored for one non-empty row, after its leading count.
    fn entries(&self, cells: &[usize], ntransitions: usize) -> Vec<String> {
        if ntransitions > self.options.threshold {
            cells.iter().map(|cell| cell.to_string()).collect()
        } else {
            alphabet()
                .filter(|byte| cells[*byte as usize] != 0)
                .map(|byte| {
                    format!(
                        "{},{}",
                        byte_literal(byte, self.options.numbers),
                        cells[byte as usize]
                    )
                })
                .collect()
        }
    }

    fn decoder(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} yy_next(int cur_state, unsigned int c)",
            STORAGE_CLASS, TYPE
        )?;
        writeln!(f, "{{")?;
        writeln!(f, "    {} *p = {}[cur_state];", TYPE, self.options.name)?;
        writeln!(f, "    int i;")?;
        writeln!(f, "    if (p) {{")?;
        writeln!(f, "        if ((i = *p++) == 0)")?;
        writeln!(f, "            return p[c];")?;
        writeln!(f, "        for (; --i >= 0; p += 2)")?;
        writeln!(f, "            if (c == p[0])")?;
        writeln!(f, "                return p[1];")?;
        writeln!(f, "    }}")?;
        writeln!(f, "    return 0;")?;
        writeln!(f, "}}")
    }
}

impl Display for Pairs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.options.name;
        let mut num_cells = 0;
        let mut rows = Vec::with_capacity(self.matrix.len());

        for (row, cells) in self.matrix.iter().enumerate() {
            let ntransitions = cells.iter().filter(|cell| **cell != 0).count();
            if ntransitions == 0 {
                rows.push(None);
                continue;
            }
            rows.push(Some(format!("{}{}", name, row)));

            let dense = ntransitions > self.options.threshold;
            write!(
                f,
                "{} {} {}{}[] = {{ {},",
                STORAGE_CLASS,
                TYPE,
                name,
                row,
                if dense { 0 } else { ntransitions }
            )?;
            let entries = self.entries(cells, ntransitions);
            num_cells += 1 + entries.len();
            for chunk in entries.chunks(NCOLS) {
                write!(f, "\n{}{},", INDENT, chunk.join(", "))?;
            }
            writeln!(f, "\n}};")?;
        }

        writeln!(f)?;
        write!(f, "{} {} *{}[{}] = {{", STORAGE_CLASS, TYPE, name, rows.len())?;
        for chunk in rows.chunks(NCOLS) {
            let line = chunk
                .iter()
                .map(|row| row.as_deref().unwrap_or("NULL"))
                .join(", ");
            write!(f, "\n{}{},", INDENT, line)?;
        }
        writeln!(f, "\n}};")?;
        writeln!(f)?;
        self.decoder(f)?;

        debug!(
            "compressed {} rows into {} cells (threshold {})",
            self.matrix.len(),
            num_cells,
            self.options.threshold
        );
        Ok(())
    }
}

fn byte_literal(byte: u8, numbers: bool) -> String {
    if numbers || !(b' '..0x7F).contains(&byte) {
        byte.to_string()
    } else {
        match byte {
            b'\'' | b'\\' => format!("'\\{}'", byte as char),
            _ => format!("'{}'", byte as char),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::nfa::Nfa;

    use super::*;

    fn dfa(pattern: &str) -> Dfa {
        Dfa::from_nfa(&Nfa::new(pattern).unwrap())
    }

    /// Runs `input` through a table the way a generated scanner would.
    fn run_table(table: &[Vec<usize>], input: &[u8]) -> usize {
        input
            .iter()
            .fold(1, |state, byte| table[state][*byte as usize])
    }

    #[test]
    fn test_graph() {
        assert_eq!(
            graph(&dfa("a[b\\\"]"), "test").to_string(),
            "digraph test {\nA -> B [ label = \"'a'\" ]\nB -> C [ label = \"'\\\"b'\" ]\n}\n"
        );
    }

    #[test]
    fn test_graph_escapes_control_bytes() {
        let out = graph(&dfa("^x"), "g").to_string();
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            vec![
                "digraph g {",
                "A -> B [ label = \"'^J'\" ]",
                "B -> C [ label = \"'x'\" ]",
                "}"
            ]
        );
        assert!(graph(&dfa(r"\\"), "g").to_string().contains("'\\\\'"));
    }

    #[test]
    fn test_matrix() {
        let dfa = dfa("ab*");
        let table = transition_matrix(&dfa);
        assert_eq!(table.len(), dfa.len() + 1);
        assert!(table[0].iter().all(|cell| *cell == 0));
        assert!(table.iter().all(|row| row.len() == ALPHABET_SIZE));
        let after_a = run_table(&table, b"a");
        assert_ne!(after_a, 0);
        assert_eq!(run_table(&table, b"abbb"), run_table(&table, b"ab"));
        assert_eq!(run_table(&table, b"b"), 0);
        assert_eq!(run_table(&table, b"ba"), 0);
    }

    #[test]
    fn test_c_table() {
        let out = table(&dfa("a"), &TableOptions::default()).to_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "#define yy_next(state, c)    Yy_nxt[state][c]");
        assert_eq!(lines[3], "static const int Yy_nxt[][127] = {");
        assert_eq!(lines.len(), 4 + 3 + 1);
        assert_eq!(*lines.last().unwrap(), "};");
        let dead = format!("/* 00000 */ {{ {}}},", "    0, ".repeat(ALPHABET_SIZE));
        assert_eq!(lines[4], dead);
        assert!(lines[5].starts_with("/* 00001 */ { "));
        assert_eq!(lines[5].matches("    2, ").count(), 1);
        assert_eq!(lines[6], dead.replace("00000", "00002"));
    }

    #[test]
    fn test_rust_table() {
        let options = TableOptions {
            name: String::from("SCAN"),
            format: TableFormat::Rust,
        };
        // Each branch ends in its own DFA state until minimization.
        let out = table(&dfa("a|b"), &options).to_string();
        assert!(out.contains("pub static SCAN: [[u16; 127]; 4] = ["));
        assert!(out.contains("    SCAN[state][c as usize]"));
        assert_eq!(out.matches("/* 0000").count(), 4);
        assert!(out.trim_end().ends_with("];"));
    }

    #[test]
    fn test_pairs_sparse_rows() {
        let options = PairsOptions::default();
        let out = pairs(&dfa("ab"), &options).to_string();
        assert!(out.contains("YYPRIVATE YY_TTYPE Yy_nxt1[] = { 1,\n          'a',2,\n};"));
        assert!(out.contains("YYPRIVATE YY_TTYPE Yy_nxt2[] = { 1,\n          'b',3,\n};"));
        assert!(!out.contains("Yy_nxt3[]"));
        assert!(out.contains(
            "YYPRIVATE YY_TTYPE *Yy_nxt[4] = {\n          NULL, Yy_nxt1, Yy_nxt2, NULL,\n};"
        ));
        assert!(out.contains("YYPRIVATE YY_TTYPE yy_next(int cur_state, unsigned int c)"));
    }

    #[test]
    fn test_pairs_dense_rows() {
        let options = PairsOptions {
            name: String::from("T"),
            threshold: 2,
            numbers: true,
        };
        let out = pairs(&dfa("[a-c]x"), &options).to_string();
        let dense_row = out
            .split("};")
            .find(|chunk| chunk.contains("T1[]"))
            .unwrap();
        assert!(dense_row.contains("T1[] = { 0,"));
        // 127 cells, ten per line.
        assert_eq!(dense_row.lines().count(), 1 + 13);
        assert!(out.contains("T2[] = { 1,\n          120,3,\n"));
    }

    #[test]
    fn test_byte_literals() {
        assert_eq!(byte_literal(b'a', false), "'a'");
        assert_eq!(byte_literal(b'\'', false), "'\\''");
        assert_eq!(byte_literal(b'\n', false), "10");
        assert_eq!(byte_literal(b'a', true), "97");
    }
}
