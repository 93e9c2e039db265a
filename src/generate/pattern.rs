//! Regex-subset value generator.
//!
//! Patterns go through three stages: tokenize, parse into a flat list of
//! quantified atoms, then sample. Supported: literals, `\d` `\w` `\s`,
//! other escaped literals, `.`, bracket classes with ranges and negation,
//! `{n}` and `{m,n}`. Anchors are accepted and ignored; groups and
//! alternation are rejected.

use super::{FieldPattern, ValueGenerator};
use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Record};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use std::sync::Mutex;

/// Longest value a single pattern produces
pub const MAX_VALUE_LEN: usize = 255;

const PRINTABLE: std::ops::RangeInclusive<char> = ' '..='~';
const WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    Escape(char),
    Class { members: Vec<char>, negated: bool },
    Quantifier { min: usize, max: usize },
    Any,
    Anchor,
}

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Literal(char),
    Digit,
    Word,
    Space,
    Any,
    /// Candidate characters, already resolved for negation
    OneOf(Vec<char>),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    atom: Atom,
    min: usize,
    max: usize,
}

/// A compiled pattern, ready to sample
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    nodes: Vec<Node>,
}

fn failed(pattern: &str, reason: impl std::fmt::Display) -> ConvertError {
    ConvertError::GenerationFailed(format!("pattern {:?}: {}", pattern, reason))
}

fn class_members(body: &[char]) -> Vec<char> {
    let mut members = Vec::new();
    let mut i = 0;
    while i < body.len() {
        if i + 2 < body.len() && body[i + 1] == '-' {
            let (lo, hi) = (body[i], body[i + 2]);
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            members.extend(lo..=hi);
            i += 3;
        } else {
            members.push(body[i]);
            i += 1;
        }
    }
    members
}

fn parse_quantifier(pattern: &str, body: &str) -> Result<(usize, usize)> {
    let number = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| failed(pattern, format!("bad quantifier {{{}}}", body)))
    };
    let (min, max) = match body.split_once(',') {
        Some((lo, hi)) => (number(lo)?, number(hi)?),
        None => {
            let n = number(body)?;
            (n, n)
        }
    };
    if min > max {
        return Err(failed(pattern, format!("quantifier {{{}}} has min above max", body)));
    }
    Ok((min, max))
}

fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        let token = match c {
            '\\' => {
                let escaped = chars.get(i).ok_or_else(|| failed(pattern, "trailing backslash"))?;
                i += 1;
                Token::Escape(*escaped)
            }
            '[' => {
                let negated = chars.get(i) == Some(&'^');
                if negated {
                    i += 1;
                }
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| failed(pattern, "unterminated character class"))?;
                let members = class_members(&chars[i..i + close]);
                i += close + 1;
                Token::Class { members, negated }
            }
            '{' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .ok_or_else(|| failed(pattern, "unterminated quantifier"))?;
                let body: String = chars[i..i + close].iter().collect();
                i += close + 1;
                let (min, max) = parse_quantifier(pattern, &body)?;
                Token::Quantifier { min, max }
            }
            '.' => Token::Any,
            '^' | '$' => Token::Anchor,
            '|' => return Err(failed(pattern, "alternation is not supported")),
            '(' | ')' => return Err(failed(pattern, "groups are not supported")),
            other => Token::Literal(other),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn atom_for(pattern: &str, token: Token) -> Result<Option<Atom>> {
    let atom = match token {
        Token::Literal(c) => Atom::Literal(c),
        Token::Escape('d') => Atom::Digit,
        Token::Escape('w') => Atom::Word,
        Token::Escape('s') => Atom::Space,
        Token::Escape(c) => Atom::Literal(c),
        Token::Any => Atom::Any,
        Token::Class { members, negated } => {
            let candidates: Vec<char> = if negated {
                PRINTABLE.filter(|c| !members.contains(c)).collect()
            } else {
                members
            };
            if candidates.is_empty() {
                return Err(failed(pattern, "character class matches nothing"));
            }
            Atom::OneOf(candidates)
        }
        Token::Anchor | Token::Quantifier { .. } => return Ok(None),
    };
    Ok(Some(atom))
}

fn parse(pattern: &str, tokens: Vec<Token>) -> Result<Vec<Node>> {
    let mut nodes = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        if let Token::Quantifier { .. } = token {
            tracing::debug!(pattern, "skipping stray quantifier");
            continue;
        }
        let Some(atom) = atom_for(pattern, token)? else {
            continue;
        };
        let (min, max) = match tokens.peek() {
            Some(Token::Quantifier { min, max }) => {
                let bounds = (*min, *max);
                tokens.next();
                bounds
            }
            _ => (1, 1),
        };
        nodes.push(Node { atom, min, max });
    }

    Ok(nodes)
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let tokens = tokenize(pattern)?;
        let nodes = parse(pattern, tokens)?;
        Ok(Pattern { nodes })
    }

    /// Draw one value, at most [`MAX_VALUE_LEN`] characters long
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::new();
        let mut len = 0;

        'nodes: for node in &self.nodes {
            let repeat = if node.min == node.max {
                node.min
            } else {
                rng.gen_range(node.min..=node.max)
            };
            for _ in 0..repeat {
                if len >= MAX_VALUE_LEN {
                    break 'nodes;
                }
                out.push(sample_atom(&node.atom, rng));
                len += 1;
            }
        }

        out
    }
}

fn sample_atom<R: Rng + ?Sized>(atom: &Atom, rng: &mut R) -> char {
    match atom {
        Atom::Literal(c) => *c,
        Atom::Digit => rng.gen_range('0'..='9'),
        Atom::Word => {
            if rng.gen_bool(0.5) {
                rng.gen_range('a'..='z')
            } else {
                rng.gen_range('0'..='9')
            }
        }
        Atom::Space => *WHITESPACE.choose(rng).unwrap_or(&' '),
        Atom::Any => rng.gen_range(PRINTABLE),
        Atom::OneOf(candidates) => *candidates.choose(rng).unwrap_or(&' '),
    }
}

/// Generates string values from per-field patterns
pub struct PatternGenerator {
    rng: Mutex<StdRng>,
}

impl PatternGenerator {
    pub fn new() -> Self {
        PatternGenerator {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible output for a given seed
    pub fn seeded(seed: u64) -> Self {
        PatternGenerator {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueGenerator for PatternGenerator {
    fn generate(&self, fields: &[FieldPattern], rows: usize) -> Result<Dataset> {
        let compiled = fields
            .iter()
            .map(|f| Pattern::compile(&f.pattern).map(|p| (f.name.as_str(), p)))
            .collect::<Result<Vec<_>>>()?;

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ConvertError::GenerationFailed("random source poisoned".to_string()))?;

        let mut dataset = Dataset::new(Vec::with_capacity(rows));
        for _ in 0..rows {
            let mut record: Record = Map::with_capacity(compiled.len());
            for (name, pattern) in &compiled {
                record.insert(name.to_string(), Value::String(pattern.sample(&mut *rng)));
            }
            dataset.push(record);
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pattern: &str, seed: u64) -> String {
        let mut rng = StdRng::seed_from_u64(seed);
        Pattern::compile(pattern).unwrap().sample(&mut rng)
    }

    #[test]
    fn test_literals_and_escapes() {
        assert_eq!(sample("abc", 1), "abc");
        assert_eq!(sample(r"a\.b\\", 1), r"a.b\");
        assert_eq!(sample("^id$", 1), "id");
    }

    #[test]
    fn test_digit_quantifier() {
        for seed in 0..20 {
            let value = sample(r"\d{3}-\d{4}", seed);
            assert_eq!(value.len(), 8);
            assert!(value[..3].chars().all(|c| c.is_ascii_digit()));
            assert_eq!(&value[3..4], "-");
        }
    }

    #[test]
    fn test_ranged_quantifier() {
        for seed in 0..50 {
            let value = sample("[a-c]{2,5}", seed);
            assert!((2..=5).contains(&value.len()), "{}", value);
            assert!(value.chars().all(|c| ('a'..='c').contains(&c)));
        }
    }

    #[test]
    fn test_classes() {
        for seed in 0..50 {
            let value = sample("[xyz]{10}", seed);
            assert!(value.chars().all(|c| "xyz".contains(c)));

            let value = sample("[^a-z]{10}", seed);
            assert!(value.chars().all(|c| !c.is_ascii_lowercase() && (' '..='~').contains(&c)));
        }
    }

    #[test]
    fn test_word_and_space() {
        for seed in 0..20 {
            assert!(sample(r"\w{8}", seed)
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert!(sample(r"\s{4}", seed).chars().all(|c| WHITESPACE.contains(&c)));
        }
    }

    #[test]
    fn test_length_capped() {
        assert_eq!(sample("a{300}", 1).len(), MAX_VALUE_LEN);
        assert_eq!(sample("a{200}b{200}", 1).len(), MAX_VALUE_LEN);
    }

    #[test]
    fn test_stray_quantifier_skipped() {
        assert_eq!(sample("{3}ab", 1), "ab");
    }

    #[test]
    fn test_rejected_patterns() {
        for bad in ["(ab)", "a|b", "[abc", "a{2", "a{x}", "a{5,2}", "ab\\", "[^ -~]"] {
            let err = Pattern::compile(bad).unwrap_err();
            assert!(matches!(err, ConvertError::GenerationFailed(_)), "{}", bad);
        }
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let fields = vec![
            FieldPattern::new("id", r"\d{5}"),
            FieldPattern::new("code", "[A-F]{3}"),
        ];
        let a = PatternGenerator::seeded(42).generate(&fields, 10).unwrap();
        let b = PatternGenerator::seeded(42).generate(&fields, 10).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        let keys: Vec<&String> = a.records()[0].keys().collect();
        assert_eq!(keys, vec!["id", "code"]);
    }

    #[test]
    fn test_zero_rows() {
        let fields = vec![FieldPattern::new("id", r"\d")];
        assert!(PatternGenerator::new().generate(&fields, 0).unwrap().is_empty());
    }
}
