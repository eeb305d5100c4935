use logos::Logos;
use thiserror::Error;

use crate::context::MachiningContext;
use crate::post::PostProcessor;

/// Tokens of generated control code
/// Covers both G-code word addresses and the ISEL command language

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")] // Skip whitespace
#[logos(error = LexerError)]
pub enum Token {
    // Address letter with a numeric value: G01, X-1.250, F120.00
    #[regex(r"[A-Za-z]-?[0-9]+(\.[0-9]+)?", word)]
    Word(Word),

    // Bare command names: FASTABS, IMF_PBL, kerf
    #[regex(r"[A-Za-z][A-Za-z_]*", |lex| lex.slice().to_string())]
    Keyword(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    // Tape start/end marker
    #[token("%")]
    Percent,

    #[regex(r"\([^)\n]*\)", |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    #[regex(r";[^\n]*", |lex| lex.slice()[1..].trim_start().to_string())]
    Comment(String),

    #[token("\n")]
    Newline,
}

/// One address word. The value keeps its printed text so the digit count
/// survives.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: String,
}

impl Word {
    /// Digits after the decimal point, 0 for integers
    pub fn decimals(&self) -> usize {
        match self.value.split_once('.') {
            Some((_, frac)) => frac.len(),
            None => 0,
        }
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.letter, self.value)
    }
}

fn word(lex: &mut logos::Lexer<Token>) -> Option<Word> {
    let mut chars = lex.slice().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    Some(Word {
        letter,
        value: chars.as_str().to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unrecognized input `{text}` on line {line}")]
pub struct UnexpectedInput {
    pub line: usize,
    pub text: String,
}

/// A token with the 1-based line it appeared on
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
    pub span: logos::Span,
}

/// Lex the input string into tokens
pub fn lex(input: &str) -> Result<Vec<Lexeme>, UnexpectedInput> {
    let mut line = 1;
    let mut lexemes = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => {
                let newline = token == Token::Newline;
                lexemes.push(Lexeme {
                    token,
                    line,
                    span,
                });
                if newline {
                    line += 1;
                }
            }
            Err(LexerError) => {
                return Err(UnexpectedInput {
                    line,
                    text: input[span].to_string(),
                })
            }
        }
    }
    Ok(lexemes)
}

/// Digit counts a program is expected to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    pub coords_decimals: usize,
    pub feedrate_decimals: usize,
}

impl Expectation {
    /// What `post` should print for `ctx`. Step-based dialects never print a
    /// decimal point.
    pub fn new(post: &dyn PostProcessor, ctx: &MachiningContext) -> Self {
        match post.step_scale() {
            Some(_) => Self {
                coords_decimals: 0,
                feedrate_decimals: 0,
            },
            None => Self {
                coords_decimals: ctx.coords_decimals,
                feedrate_decimals: ctx.feedrate_decimals,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionViolation {
    pub line: usize,
    pub word: String,
    pub expected: usize,
    pub found: usize,
}

impl std::fmt::Display for PrecisionViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: {} has {} decimals, expected {}",
            self.line, self.word, self.found, self.expected
        )
    }
}

/// Find every coordinate (X, Y, Z) and feed (F) word whose digit count
/// differs from `expect`. Comments are not inspected.
pub fn check_precision(
    source: &str,
    expect: &Expectation,
) -> Result<Vec<PrecisionViolation>, UnexpectedInput> {
    let violations = lex(source)?
        .into_iter()
        .filter_map(|lexeme| {
            let Token::Word(word) = lexeme.token else {
                return None;
            };
            let expected = match word.letter {
                'X' | 'Y' | 'Z' => expect.coords_decimals,
                'F' => expect.feedrate_decimals,
                _ => return None,
            };
            let found = word.decimals();
            (found != expected).then(|| PrecisionViolation {
                line: lexeme.line,
                word: word.to_string(),
                expected,
                found,
            })
        })
        .collect();
    Ok(violations)
}
