use colored::Colorize;
use log::trace;
use thiserror::Error;

use crate::lexer::{Lexer, Token};
use crate::nfa::{CharClass, Edge, Nfa, NfaArena};
use crate::utils::Anchor;

/// A fragment under construction: its start and end node.
type Fragment = (usize, usize);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("'{quantifier}' must follow an expression")]
    DanglingQuantifier { quantifier: char, position: usize },

    #[error("encountered a stray ']'")]
    StrayBracket { position: usize },

    #[error("encountered a stray '^'")]
    StrayCaret { position: usize },

    #[error("expected ')'")]
    UnmatchedParen { position: usize },

    #[error("encountered a ')' without a matching '('")]
    StrayParen { position: usize },

    #[error("expected an expression")]
    EmptyExpression { position: usize },

    #[error("character class is never closed")]
    UnterminatedClass { position: usize },

    #[error("invalid character range {from}-{to}")]
    InvalidCharacterRange { from: char, to: char, position: usize },

    #[error("byte 0x{byte:02x} is outside the alphabet")]
    ByteOutOfRange { byte: u8, position: usize },
}

impl ParserError {
    pub fn position(&self) -> usize {
        match *self {
            Self::DanglingQuantifier { position, .. }
            | Self::StrayBracket { position }
            | Self::StrayCaret { position }
            | Self::UnmatchedParen { position }
            | Self::StrayParen { position }
            | Self::EmptyExpression { position }
            | Self::UnterminatedClass { position }
            | Self::InvalidCharacterRange { position, .. }
            | Self::ByteOutOfRange { position, .. } => position,
        }
    }

    /// A diagnostic showing the pattern with a caret under the failure.
    pub fn render(&self, pattern: &str) -> String {
        let column = pattern
            .char_indices()
            .take_while(|(offset, _)| *offset < self.position())
            .count();
        format!(
            "{}: {}\n | {}\n | {}{}",
            "error".red().bold(),
            self,
            pattern,
            " ".repeat(column),
            "^".green().bold()
        )
    }
}

/// Recursive-descent parser that builds the automaton while it reads.
///
/// Every production leaves the lexer on the first token it did not consume.
struct Parser<'a> {
    lexer: Lexer<'a>,
    arena: NfaArena,
}

/// Builds an NFA for `pattern`.
pub fn thompson(pattern: &str) -> Result<Nfa, ParserError> {
    let mut parser = Parser {
        lexer: Lexer::new(pattern),
        arena: NfaArena::new(),
    };
    let start = parser.machine()?;
    Ok(parser.arena.finish(start))
}

impl<'a> Parser<'a> {
    #[inline]
    fn token(&self) -> Token {
        self.lexer.token()
    }

    #[inline]
    fn advance(&mut self) -> Result<Token, ParserError> {
        self.lexer.advance()
    }

    /// machine -> rule rule*
    ///
    /// Rules hang off a chain of epsilon nodes: `next[0]` enters the rule,
    /// `next[1]` continues to the next link.
    fn machine(&mut self) -> Result<usize, ParserError> {
        let start = self.arena.alloc();
        let mut link = start;
        self.advance()?;
        self.arena[link].next[0] = Some(self.rule()?);
        while self.token() != Token::Eoi {
            let next = self.arena.alloc();
            self.arena[link].next[1] = Some(next);
            link = next;
            self.arena[link].next[0] = Some(self.rule()?);
        }
        Ok(start)
    }

    /// rule -> '^'? expr '$'?
    fn rule(&mut self) -> Result<usize, ParserError> {
        let mut anchor = Anchor::NONE;
        let (start, mut end) = if self.token() == Token::Caret {
            let start = self.arena.alloc();
            self.arena[start].edge = Edge::Literal(b'\n');
            anchor |= Anchor::BOL;
            self.advance()?;
            let (first, end) = self.expr()?;
            self.arena[start].next[0] = Some(first);
            (start, end)
        } else {
            self.expr()?
        };

        if self.token() == Token::Dollar {
            self.advance()?;
            let mut class = CharClass::new();
            class.set.insert(b'\n' as usize);
            class.set.insert(b'\r' as usize);
            let terminal = self.arena.alloc();
            self.arena[end].edge = Edge::Class(class);
            self.arena[end].next[0] = Some(terminal);
            end = terminal;
            anchor |= Anchor::EOL;
        }

        if self.token() == Token::RightParen {
            return Err(ParserError::StrayParen {
                position: self.lexer.position(),
            });
        }

        self.arena[end].anchor = anchor;
        trace!("rule {}..{} anchored {:?}", start, end, anchor);
        Ok(start)
    }

    /// expr -> cat_expr ('|' cat_expr)*
    fn expr(&mut self) -> Result<Fragment, ParserError> {
        let (mut start, mut end) = self.cat_expr()?;
        while self.token() == Token::Pipe {
            self.advance()?;
            let (alt_start, alt_end) = self.cat_expr()?;

            let fork = self.arena.alloc();
            self.arena[fork].next = [Some(start), Some(alt_start)];
            start = fork;

            let join = self.arena.alloc();
            self.arena[end].next[0] = Some(join);
            self.arena[alt_end].next[0] = Some(join);
            end = join;
        }
        Ok((start, end))
    }

    /// cat_expr -> factor factor*
    ///
    /// The end node of the left fragment absorbs the start node of the right
    /// one, so no epsilon edge is added between them.
    fn cat_expr(&mut self) -> Result<Fragment, ParserError> {
        if !self.first_in_cat()? {
            return Err(ParserError::EmptyExpression {
                position: self.lexer.position(),
            });
        }
        let (start, mut end) = self.factor()?;
        while self.first_in_cat()? {
            let (next_start, next_end) = self.factor()?;
            self.arena.splice(end, next_start);
            end = next_end;
        }
        Ok((start, end))
    }

    fn first_in_cat(&self) -> Result<bool, ParserError> {
        let position = self.lexer.position();
        match self.token() {
            Token::RightParen | Token::Dollar | Token::Pipe | Token::Eoi => Ok(false),
            Token::Star | Token::Plus | Token::QuestionMark => {
                Err(ParserError::DanglingQuantifier {
                    quantifier: self.lexer.lexeme() as char,
                    position,
                })
            }
            Token::RightBracket => Err(ParserError::StrayBracket { position }),
            Token::Caret => Err(ParserError::StrayCaret { position }),
            _ => Ok(true),
        }
    }

    /// factor -> term ('*' | '+' | '?')?
    fn factor(&mut self) -> Result<Fragment, ParserError> {
        let (inner_start, inner_end) = self.term()?;
        let token = self.token();
        if !matches!(token, Token::Star | Token::Plus | Token::QuestionMark) {
            return Ok((inner_start, inner_end));
        }

        let start = self.arena.alloc();
        let end = self.arena.alloc();
        self.arena[start].next[0] = Some(inner_start);
        self.arena[inner_end].next[0] = Some(end);
        if matches!(token, Token::Star | Token::QuestionMark) {
            self.arena[start].next[1] = Some(end);
        }
        if matches!(token, Token::Star | Token::Plus) {
            self.arena[inner_end].next[1] = Some(inner_start);
        }
        self.advance()?;
        Ok((start, end))
    }

    /// term -> '(' expr ')' | '.' | '[' class ']' | literal
    fn term(&mut self) -> Result<Fragment, ParserError> {
        if self.token() == Token::LeftParen {
            let open = self.lexer.position();
            self.advance()?;
            let fragment = self.expr()?;
            if self.token() != Token::RightParen {
                return Err(ParserError::UnmatchedParen {
                    position: match self.token() {
                        Token::Eoi => open,
                        _ => self.lexer.position(),
                    },
                });
            }
            self.advance()?;
            return Ok(fragment);
        }

        let start = self.arena.alloc();
        let end = self.arena.alloc();
        self.arena[start].next[0] = Some(end);

        let edge = match self.token() {
            Token::Dot => {
                let mut class = CharClass::new();
                class.set.insert(b'\n' as usize);
                class.set.insert(b'\r' as usize);
                class.complement = true;
                Edge::Class(class)
            }
            Token::LeftBracket => Edge::Class(self.bracket()?),
            _ => Edge::Literal(self.lexer.lexeme()),
        };
        self.arena[start].edge = edge;
        self.advance()?;
        Ok((start, end))
    }

    /// The body of `[...]`. Returns with the lexer on the closing `]`.
    fn bracket(&mut self) -> Result<CharClass, ParserError> {
        let open = self.lexer.position();
        let mut class = CharClass::new();
        self.advance()?;
        if self.token() == Token::Caret {
            class.complement = true;
            self.advance()?;
        }
        if self.token() == Token::RightBracket {
            class.set.insert_range(0, b' ' as usize);
        } else {
            self.do_dash(&mut class)?;
        }
        if self.token() != Token::RightBracket {
            return Err(ParserError::UnterminatedClass { position: open });
        }
        Ok(class)
    }

    /// Collects bytes and `a-z` ranges until `]` or end of input.
    fn do_dash(&mut self, class: &mut CharClass) -> Result<(), ParserError> {
        let mut previous: Option<u8> = None;
        while !matches!(self.token(), Token::Eoi | Token::RightBracket) {
            match (self.token(), previous) {
                (Token::Dash, Some(from)) => {
                    let position = self.lexer.position();
                    self.advance()?;
                    if matches!(self.token(), Token::Eoi | Token::RightBracket) {
                        class.set.insert(b'-' as usize);
                        break;
                    }
                    let to = self.lexer.lexeme();
                    if to < from {
                        return Err(ParserError::InvalidCharacterRange {
                            from: from as char,
                            to: to as char,
                            position,
                        });
                    }
                    class.set.insert_range(from as usize, to as usize);
                    previous = None;
                }
                _ => {
                    let byte = self.lexer.lexeme();
                    class.set.insert(byte as usize);
                    previous = Some(byte);
                }
            }
            self.advance()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn class_of(pattern: &str) -> CharClass {
        let nfa = thompson(pattern).unwrap();
        nfa.nodes()
            .iter()
            .find_map(|node| match &node.edge {
                Edge::Class(class) => Some(class.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn members(class: &CharClass) -> Vec<u8> {
        class.set.iter().map(|byte| byte as u8).collect()
    }

    #[test]
    fn test_concatenation_splices_nodes() {
        // machine link + two nodes per literal, minus one per splice.
        let nfa = thompson("abc").unwrap();
        assert_eq!(nfa.len(), 1 + 3 * 2 - 2);
        let epsilons = nfa
            .nodes()
            .iter()
            .filter(|node| node.edge == Edge::Epsilon && !node.is_terminal())
            .count();
        assert_eq!(epsilons, 1);
        assert!(nfa.is_match(b"abc"));
        assert!(!nfa.is_match(b"ab"));
    }

    #[test]
    fn test_indices_are_dense() {
        let nfa = thompson("(a|bc)*d+e?").unwrap();
        for (position, node) in nfa.nodes().iter().enumerate() {
            assert_eq!(node.index, position);
            for next in node.next.iter().flatten() {
                assert!(*next < nfa.len());
            }
        }
    }

    #[test]
    fn test_every_node_but_the_accepting_one_continues() {
        let nfa = thompson("x(a|b)*y").unwrap();
        let terminals = nfa.nodes().iter().filter(|node| node.is_terminal()).count();
        assert_eq!(terminals, 1);
    }

    #[test]
    fn test_quantifiers() {
        let star = thompson("a*").unwrap();
        assert!(star.is_match(b""));
        assert!(star.is_match(b"aaa"));
        let plus = thompson("a+").unwrap();
        assert!(!plus.is_match(b""));
        assert!(plus.is_match(b"aa"));
        let optional = thompson("ab?").unwrap();
        assert!(optional.is_match(b"a"));
        assert!(optional.is_match(b"ab"));
        assert!(!optional.is_match(b"abb"));
    }

    #[test]
    fn test_anchors() {
        let nfa = thompson("^foo$").unwrap();
        assert_eq!(nfa.anchor(), Anchor::BOTH);
        assert!(nfa.is_match(b"\nfoo\n"));
        assert!(nfa.is_match(b"\nfoo\r"));
        assert!(!nfa.is_match(b"foo"));
        assert_eq!(thompson("^foo").unwrap().anchor(), Anchor::BOL);
        assert_eq!(thompson("foo$").unwrap().anchor(), Anchor::EOL);
        assert_eq!(thompson("foo").unwrap().anchor(), Anchor::NONE);
    }

    #[test]
    fn test_bracket_classes() {
        assert_eq!(members(&class_of("[a-c]")), b"abc".to_vec());
        assert_eq!(members(&class_of("[xa-c]")), b"abcx".to_vec());
        assert_eq!(members(&class_of("[-a]")), b"-a".to_vec());
        assert_eq!(members(&class_of("[a-]")), b"-a".to_vec());
        assert_eq!(members(&class_of("[a-c-e]")), b"-abce".to_vec());
        assert_eq!(members(&class_of(r"[\]]")), b"]".to_vec());
        assert_eq!(members(&class_of("[.^$]")), b"$.^".to_vec());

        let negated = class_of("[^a-c]");
        assert!(negated.complement);
        assert_eq!(members(&negated), b"abc".to_vec());

        let dot = class_of(".");
        assert!(dot.complement);
        assert_eq!(members(&dot), b"\n\r".to_vec());
    }

    #[test]
    fn test_empty_bracket_is_whitespace_and_controls() {
        let class = class_of("[]");
        assert!(!class.complement);
        assert_eq!(members(&class), (0..=b' ').collect::<Vec<u8>>());
    }

    #[test]
    fn test_multiple_rules() {
        let nfa = thompson("ab$cd").unwrap();
        let terminals = nfa.nodes().iter().filter(|node| node.is_terminal()).count();
        assert_eq!(terminals, 2);
        assert!(nfa.is_match(b"ab\n"));
        assert!(nfa.is_match(b"cd"));
        assert!(!nfa.is_match(b"ab"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            thompson("*a").unwrap_err(),
            ParserError::DanglingQuantifier {
                quantifier: '*',
                position: 0
            }
        );
        assert_eq!(
            thompson("a|+").unwrap_err(),
            ParserError::DanglingQuantifier {
                quantifier: '+',
                position: 2
            }
        );
        assert_eq!(
            thompson("a**").unwrap_err(),
            ParserError::DanglingQuantifier {
                quantifier: '*',
                position: 2
            }
        );
        assert_eq!(
            thompson("ab]").unwrap_err(),
            ParserError::StrayBracket { position: 2 }
        );
        assert_eq!(
            thompson("a^b").unwrap_err(),
            ParserError::StrayCaret { position: 1 }
        );
        assert_eq!(
            thompson("(ab").unwrap_err(),
            ParserError::UnmatchedParen { position: 0 }
        );
        assert_eq!(
            thompson("ab)").unwrap_err(),
            ParserError::StrayParen { position: 2 }
        );
        assert_eq!(
            thompson("").unwrap_err(),
            ParserError::EmptyExpression { position: 0 }
        );
        assert_eq!(
            thompson("a|").unwrap_err(),
            ParserError::EmptyExpression { position: 2 }
        );
        assert_eq!(
            thompson("[abc").unwrap_err(),
            ParserError::UnterminatedClass { position: 0 }
        );
        assert_eq!(
            thompson("[z-a]").unwrap_err(),
            ParserError::InvalidCharacterRange {
                from: 'z',
                to: 'a',
                position: 2
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = thompson("+").unwrap_err();
        assert_eq!(err.to_string(), "'+' must follow an expression");
        colored::control::set_override(false);
        assert_eq!(
            err.render("+"),
            "error: '+' must follow an expression\n | +\n | ^"
        );
        let err = thompson("ab]").unwrap_err();
        assert_eq!(err.render("ab]"), "error: encountered a stray ']'\n | ab]\n |   ^");
    }
}
