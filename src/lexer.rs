use crate::parser::ParserError;
use crate::utils::ALPHABET_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Eoi,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Caret,
    Dash,
    Dot,
    Dollar,
    Literal,
    Pipe,
    Plus,
    QuestionMark,
    Star,
}

impl Token {
    fn from_byte(byte: u8) -> Token {
        match byte {
            b'$' => Token::Dollar,
            b'(' => Token::LeftParen,
            b')' => Token::RightParen,
            b'*' => Token::Star,
            b'+' => Token::Plus,
            b'-' => Token::Dash,
            b'.' => Token::Dot,
            b'?' => Token::QuestionMark,
            b'[' => Token::LeftBracket,
            b']' => Token::RightBracket,
            b'^' => Token::Caret,
            b'|' => Token::Pipe,
            _ => Token::Literal,
        }
    }
}

/// Splits a pattern into tokens, one [`Lexer::advance`] at a time.
///
/// The lexer keeps the current token and the byte it stands for (the
/// lexeme). Quoted spans and escaped bytes always produce
/// [`Token::Literal`].
#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
    in_quote: bool,
    token: Token,
    lexeme: u8,
    lexeme_position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            input: input.as_bytes(),
            position: 0,
            in_quote: false,
            token: Token::Eoi,
            lexeme: 0,
            lexeme_position: 0,
        }
    }

    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    #[inline]
    pub fn lexeme(&self) -> u8 {
        self.lexeme
    }

    /// Offset in the pattern where the current token starts.
    #[inline]
    pub fn position(&self) -> usize {
        self.lexeme_position
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.get(self.position + offset).copied()
    }

    pub fn advance(&mut self) -> Result<Token, ParserError> {
        while self.peek(0) == Some(b'"') {
            self.in_quote = !self.in_quote;
            self.position += 1;
        }

        self.lexeme_position = self.position;
        let byte = match self.peek(0) {
            Some(byte) => byte,
            None => {
                self.token = Token::Eoi;
                self.lexeme = 0;
                return Ok(self.token);
            }
        };

        let escaped = byte == b'\\' && self.peek(1).is_some();
        self.lexeme = if self.in_quote {
            if escaped && self.peek(1) == Some(b'"') {
                self.position += 2;
                b'"'
            } else {
                self.position += 1;
                byte
            }
        } else if escaped {
            self.position += 2;
            match self.input[self.position - 1] {
                b't' => b'\t',
                b'n' => b'\n',
                b'r' => b'\r',
                other => other,
            }
        } else {
            self.position += 1;
            byte
        };

        if self.lexeme as usize >= ALPHABET_SIZE {
            return Err(ParserError::ByteOutOfRange {
                byte: self.lexeme,
                position: self.lexeme_position,
            });
        }

        self.token = if self.in_quote || escaped {
            Token::Literal
        } else {
            Token::from_byte(self.lexeme)
        };
        Ok(self.token)
    }
}
