//! Compact policy string parser.
//!
//! Grammar:
//!
//! ```text
//! policy := expr EOF
//! expr   := AND '(' args ')' | OR '(' args ')' | OutOf '(' NUMBER ',' args ')' | leaf
//! args   := expr (',' expr)*
//! leaf   := 'msp.role' | "msp.role" | msp.role
//! ```
//!
//! Each distinct principal is appended to the identity list on first
//! appearance; later references reuse its index.

use std::collections::HashMap;

use crate::error::PolicyError;
use crate::types::{CanonicalPolicy, Identity, RolePrincipal, Rule, MAX_POLICY_DEPTH};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    Symbol(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) | Token::Number(s) => s.clone(),
            Token::Str(s) => format!("'{s}'"),
            Token::Symbol(c) => c.to_string(),
        }
    }
}

/// Parse a compact policy string into a canonical policy.
pub fn parse_compact(input: &str) -> Result<CanonicalPolicy, PolicyError> {
    if input.trim().is_empty() {
        return Err(PolicyError::Empty);
    }
    let tokens = tokenize(input)?;
    check_nesting(&tokens)?;

    let mut parser = Parser::new(tokens);
    let rule = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(PolicyError::UnexpectedToken(token.describe()));
    }

    // A lone principal is a one-identity policy.
    let policy = CanonicalPolicy::new(parser.identities, rule);
    policy.validate()?;
    Ok(policy)
}

fn tokenize(input: &str) -> Result<Vec<Token>, PolicyError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '\'' || ch == '"' {
            let quote = ch;
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == quote {
                    closed = true;
                    break;
                }
                value.push(c);
            }
            if !closed {
                return Err(PolicyError::UnexpectedToken(format!("{quote}{value}")));
            }
            tokens.push(Token::Str(value));
            continue;
        }

        if is_word_char(ch) {
            let mut value = String::new();
            while let Some(c) = chars.peek().copied() {
                if is_word_char(c) {
                    value.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if value.chars().all(|c| c.is_ascii_digit()) {
                tokens.push(Token::Number(value));
            } else {
                tokens.push(Token::Ident(value));
            }
            continue;
        }

        if matches!(ch, '(' | ')' | ',') {
            tokens.push(Token::Symbol(ch));
            chars.next();
            continue;
        }

        return Err(PolicyError::UnexpectedToken(ch.to_string()));
    }

    Ok(tokens)
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':' | '/')
}

/// Reject unbalanced or over-deep groups before the recursive descent runs.
fn check_nesting(tokens: &[Token]) -> Result<(), PolicyError> {
    let mut depth = 0usize;
    for (offset, token) in tokens.iter().enumerate() {
        match token {
            Token::Symbol('(') => {
                depth += 1;
                if depth > MAX_POLICY_DEPTH {
                    return Err(PolicyError::TooDeep {
                        limit: MAX_POLICY_DEPTH,
                    });
                }
            }
            Token::Symbol(')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(PolicyError::UnbalancedParentheses(offset))?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(PolicyError::UnbalancedParentheses(tokens.len()));
    }
    Ok(())
}

enum Keyword {
    And,
    Or,
    OutOf,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    identities: Vec<Identity>,
    seen: HashMap<RolePrincipal, u32>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            identities: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn parse_expr(&mut self) -> Result<Rule, PolicyError> {
        let token = self.next().ok_or(PolicyError::Empty)?;
        match token {
            Token::Ident(word) if self.peek() == Some(&Token::Symbol('(')) => {
                let keyword = match word.to_ascii_uppercase().as_str() {
                    "AND" => Keyword::And,
                    "OR" => Keyword::Or,
                    "OUTOF" => Keyword::OutOf,
                    _ => return Err(PolicyError::UnknownKeyword(word)),
                };
                self.pos += 1;
                self.parse_group(keyword)
            }
            Token::Ident(word) | Token::Str(word) => self.leaf(&word),
            other => Err(PolicyError::UnexpectedToken(other.describe())),
        }
    }

    fn parse_group(&mut self, keyword: Keyword) -> Result<Rule, PolicyError> {
        let explicit_n = match keyword {
            Keyword::OutOf => {
                let n = self.consume_count()?;
                self.consume_symbol(',')?;
                Some(n)
            }
            _ => None,
        };

        if self.peek() == Some(&Token::Symbol(')')) {
            return Err(PolicyError::EmptyRuleSet);
        }

        let mut rules = vec![self.parse_expr()?];
        loop {
            match self.next() {
                Some(Token::Symbol(',')) => rules.push(self.parse_expr()?),
                Some(Token::Symbol(')')) => break,
                Some(other) => return Err(PolicyError::UnexpectedToken(other.describe())),
                None => return Err(PolicyError::UnbalancedParentheses(self.pos)),
            }
        }

        let n = match keyword {
            Keyword::And => rules.len() as u32,
            Keyword::Or => 1,
            Keyword::OutOf => {
                let n = explicit_n.unwrap_or_default();
                if n == 0 || n as usize > rules.len() {
                    return Err(PolicyError::OutOfRange {
                        n,
                        available: rules.len(),
                    });
                }
                n
            }
        };
        Ok(Rule::NOutOf { n, rules })
    }

    fn leaf(&mut self, token: &str) -> Result<Rule, PolicyError> {
        let principal = RolePrincipal::parse(token)?;
        if let Some(index) = self.seen.get(&principal) {
            return Ok(Rule::SignedBy(*index));
        }
        let index = self.identities.len() as u32;
        self.identities.push(Identity {
            classification: Default::default(),
            principal: principal.clone(),
        });
        self.seen.insert(principal, index);
        Ok(Rule::SignedBy(index))
    }

    fn consume_count(&mut self) -> Result<u32, PolicyError> {
        match self.next() {
            Some(Token::Number(value)) => value
                .parse::<u32>()
                .map_err(|_| PolicyError::InvalidOutOfCount(value)),
            Some(other) => Err(PolicyError::InvalidOutOfCount(other.describe())),
            None => Err(PolicyError::InvalidOutOfCount(String::new())),
        }
    }

    fn consume_symbol(&mut self, expected: char) -> Result<(), PolicyError> {
        match self.next() {
            Some(Token::Symbol(c)) if c == expected => Ok(()),
            Some(other) => Err(PolicyError::UnexpectedToken(other.describe())),
            None => Err(PolicyError::UnexpectedToken(format!(
                "end of input, expected '{expected}'"
            ))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MspRole;

    fn principal(policy: &CanonicalPolicy, index: usize) -> (&str, MspRole) {
        let p = &policy.identities[index].principal;
        (p.msp_id.as_str(), p.role)
    }

    #[test]
    fn parses_and_of_two() {
        let policy = parse_compact("AND('Org1.member', 'Org2.member')").unwrap();
        assert_eq!(policy.version, 0);
        assert_eq!(policy.identities.len(), 2);
        assert_eq!(principal(&policy, 0), ("Org1", MspRole::Member));
        assert_eq!(principal(&policy, 1), ("Org2", MspRole::Member));
        assert_eq!(
            policy.rule,
            Rule::n_out_of(2, vec![Rule::SignedBy(0), Rule::SignedBy(1)])
        );
    }

    #[test]
    fn repeated_principals_share_an_index() {
        let policy =
            parse_compact("OR(AND('Org1.member','Org2.peer'), AND('Org1.MEMBER','Org3.admin'))")
                .unwrap();
        assert_eq!(policy.identities.len(), 3);
        assert_eq!(
            policy.rule,
            Rule::n_out_of(
                1,
                vec![
                    Rule::n_out_of(2, vec![Rule::SignedBy(0), Rule::SignedBy(1)]),
                    Rule::n_out_of(2, vec![Rule::SignedBy(0), Rule::SignedBy(2)]),
                ]
            )
        );
    }

    #[test]
    fn out_of_uses_explicit_count() {
        let policy =
            parse_compact("OutOf(2, 'Org1.member', \"Org2.member\", Org3.member)").unwrap();
        match policy.rule {
            Rule::NOutOf { n, ref rules } => {
                assert_eq!(n, 2);
                assert_eq!(rules.len(), 3);
            }
            _ => panic!("expected NOutOf"),
        }
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let upper = parse_compact("OUTOF(1, 'A.member', 'B.member')").unwrap();
        let lower = parse_compact("outof(1, 'A.member', 'B.member')").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn lone_leaf_is_signed_by_zero() {
        let policy = parse_compact("'Org1MSP.admin'").unwrap();
        assert_eq!(policy.rule, Rule::SignedBy(0));
        assert_eq!(principal(&policy, 0), ("Org1MSP", MspRole::Admin));
    }

    #[test]
    fn dotted_msp_ids() {
        let policy = parse_compact("OR('org1.example.com.peer')").unwrap();
        assert_eq!(principal(&policy, 0), ("org1.example.com", MspRole::Peer));
    }

    #[test]
    fn out_of_bounds() {
        assert_eq!(
            parse_compact("OutOf(3, 'Org1.member', 'Org2.member')"),
            Err(PolicyError::OutOfRange { n: 3, available: 2 })
        );
        assert_eq!(
            parse_compact("OutOf(0, 'Org1.member')"),
            Err(PolicyError::OutOfRange { n: 0, available: 1 })
        );
        assert!(matches!(
            parse_compact("OutOf('x', 'Org1.member')"),
            Err(PolicyError::InvalidOutOfCount(_))
        ));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse_compact("   "), Err(PolicyError::Empty));
        assert!(matches!(
            parse_compact("AND('Org1.member'"),
            Err(PolicyError::UnbalancedParentheses(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1.member'))"),
            Err(PolicyError::UnbalancedParentheses(_))
        ));
        assert_eq!(parse_compact("AND()"), Err(PolicyError::EmptyRuleSet));
        assert_eq!(
            parse_compact("XOR('Org1.member')"),
            Err(PolicyError::UnknownKeyword("XOR".into()))
        );
        assert!(matches!(
            parse_compact("AND('Org1.owner')"),
            Err(PolicyError::UnknownRole(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1member')"),
            Err(PolicyError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1.member') OR('Org2.member')"),
            Err(PolicyError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1.member' 'Org2.member')"),
            Err(PolicyError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1.member"),
            Err(PolicyError::UnexpectedToken(_))
        ));
        assert!(matches!(
            parse_compact("AND('Org1.member';)"),
            Err(PolicyError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let depth = 2000;
        let input = format!("{}'Org1.member'{}", "OR(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            parse_compact(&input),
            Err(PolicyError::TooDeep {
                limit: MAX_POLICY_DEPTH
            })
        );
    }

    #[test]
    fn moderate_nesting_parses() {
        let depth = 200;
        let input = format!("{}'Org1.member'{}", "AND(".repeat(depth), ")".repeat(depth));
        let policy = parse_compact(&input).unwrap();
        assert_eq!(policy.rule.depth(), depth);
    }
}
