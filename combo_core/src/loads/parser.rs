//! Combination string parsing
//!
//! Grammar (ASCII, whitespace insignificant):
//!
//! ```text
//! or    := and ('|' and)*
//! and   := mul ('&' mul)*
//! mul   := atom ('*' atom)*
//! atom  := NUMBER | IDENT | '(' or ')'
//! NUMBER:= [0-9]*\.?[0-9]*   (at least one digit)
//! IDENT := [A-Za-z_][A-Za-z0-9_]*
//! ```
//!
//! Validation happens in two independent passes. The operand pass splits the
//! string on `&`, `|`, `(` and `)` and checks that every multiplication chain
//! is `number * ... * number * IDENT`, recording identifiers. The structural
//! pass tokenizes and parses the whole string, catching unbalanced
//! parentheses and dangling operators. Evaluation then walks the syntax tree
//! over the composition algebra.

use std::collections::HashMap;

use super::algebra::{ScaledTerm, Term};
use crate::errors::{ComboError, ComboResult};

const STRUCTURAL_OPERATORS: [char; 4] = ['&', '|', '(', ')'];

/// Extract the distinct load case identifiers of a combination string, in
/// first-appearance order, rejecting malformed expressions.
///
/// # Example
/// ```
/// use combo_core::loads::parser::parse_identifiers;
///
/// let ids = parse_identifiers("1.2*D & 1.6*L & 0.5*(Lr|S|R)").unwrap();
/// assert_eq!(ids, ["D", "L", "Lr", "S", "R"]);
///
/// assert!(parse_identifiers("1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W").is_err());
/// ```
pub fn parse_identifiers(expr: &str) -> ComboResult<Vec<String>> {
    let mut identifiers: Vec<String> = Vec::new();

    let fragments = expr
        .split(|c: char| STRUCTURAL_OPERATORS.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for fragment in fragments {
        let mut operands: Vec<&str> = fragment.split('*').map(str::trim).collect();
        // An empty last operand means the chain multiplies a parenthesized group
        let Some(last) = operands.pop() else { continue };

        for operand in &operands {
            if !is_numeric_literal(operand) {
                return Err(ComboError::expression_at(
                    expr,
                    fragment,
                    format!("left operand {:?} of '*' must be a number", operand),
                ));
            }
        }

        if !last.is_empty() {
            if !is_identifier(last) {
                return Err(ComboError::expression_at(
                    expr,
                    fragment,
                    format!("{:?} is not a valid load case name", last),
                ));
            }
            if !identifiers.iter().any(|id| id == last) {
                identifiers.push(last.to_string());
            }
        }
    }

    syntax_tree(expr)?;

    Ok(identifiers)
}

/// Evaluate a validated combination string, binding each identifier to a
/// fresh unit-factor [`ScaledTerm`].
///
/// Composition failures are reported as expression errors on `expr`.
pub fn evaluate(expr: &str, identifiers: &[String]) -> ComboResult<Term> {
    let tree = syntax_tree(expr)?;
    let bindings: HashMap<&str, ScaledTerm> = identifiers
        .iter()
        .map(|id| (id.as_str(), ScaledTerm::new(id.as_str())))
        .collect();

    let evaluator = TreeEvaluator { expr, bindings };
    match evaluator.eval(&tree).map_err(|e| e.within_expression(expr))? {
        Value::Term(term) => {
            tracing::trace!(expr, kind = term.kind(), "evaluated combination expression");
            Ok(term)
        }
        Value::Number(n) => Err(ComboError::expression(
            expr,
            format!("evaluates to the number {} rather than a load combination", n),
        )),
    }
}

/// Digits with dots allowed anywhere (`1.2`, `.5`, `1.`); at least one digit.
fn is_numeric_literal(s: &str) -> bool {
    !s.is_empty() && s.replace('.', "1").chars().all(|c| c.is_ascii_digit())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    And,
    Or,
    Star,
    LParen,
    RParen,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Ident(name) => format!("load case {:?}", name),
            TokenKind::And => "'&'".to_string(),
            TokenKind::Or => "'|'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn token_err(expr: &str, span: Span, reason: String) -> ComboError {
    ComboError::expression_at(
        expr,
        &expr[span.start..span.end],
        format!("column {}: {}", span.start + 1, reason),
    )
}

fn tokenize(expr: &str) -> ComboResult<Vec<Token>> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let kind = match b {
            b'&' => {
                i += 1;
                TokenKind::And
            }
            b'|' => {
                i += 1;
                TokenKind::Or
            }
            b'*' => {
                i += 1;
                TokenKind::Star
            }
            b'(' => {
                i += 1;
                TokenKind::LParen
            }
            b')' => {
                i += 1;
                TokenKind::RParen
            }
            b'0'..=b'9' | b'.' => {
                let mut seen_dot = false;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || (bytes[i] == b'.' && !seen_dot)) {
                    seen_dot |= bytes[i] == b'.';
                    i += 1;
                }
                let text = &expr[start..i];
                let value = text.parse::<f64>().map_err(|_| {
                    token_err(expr, Span { start, end: i }, format!("{:?} is not a number", text))
                })?;
                TokenKind::Number(value)
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                TokenKind::Ident(expr[start..i].to_string())
            }
            _ => {
                let ch = expr[start..].chars().next().unwrap_or('?');
                return Err(token_err(
                    expr,
                    Span { start, end: start + ch.len_utf8() },
                    format!("unexpected character {:?}", ch),
                ));
            }
        };

        tokens.push(Token { kind, span: Span { start, end: i } });
    }

    Ok(tokens)
}

// ── Syntax tree ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Ident(String),
    Mul(Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

fn syntax_tree(expr: &str) -> ComboResult<Node> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ComboError::expression(expr, "empty expression"));
    }

    let mut parser = Parser { expr, tokens: &tokens, pos: 0 };
    let tree = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        let reason = match token.kind {
            TokenKind::RParen => "unbalanced parentheses: unmatched ')'".to_string(),
            ref other => format!("unexpected {} after a complete expression", other.describe()),
        };
        return Err(token_err(expr, token.span, reason));
    }

    Ok(tree)
}

struct Parser<'a> {
    expr: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    fn parse_or(&mut self) -> ComboResult<Node> {
        let mut lhs = self.parse_and()?;
        while self.at(&TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Node::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ComboResult<Node> {
        let mut lhs = self.parse_mul()?;
        while self.at(&TokenKind::And) {
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Node::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> ComboResult<Node> {
        let mut lhs = self.parse_atom()?;
        while self.at(&TokenKind::Star) {
            self.advance();
            let rhs = self.parse_atom()?;
            lhs = Node::Mul(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> ComboResult<Node> {
        let Some(token) = self.advance() else {
            return Err(ComboError::expression(
                self.expr,
                "expression ends with a dangling operator",
            ));
        };

        match &token.kind {
            TokenKind::Number(n) => Ok(Node::Number(*n)),
            TokenKind::Ident(name) => Ok(Node::Ident(name.clone())),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token { kind: TokenKind::RParen, .. }) => Ok(inner),
                    Some(other) => Err(token_err(
                        self.expr,
                        other.span,
                        format!("expected ')' but found {}", other.kind.describe()),
                    )),
                    None => Err(token_err(
                        self.expr,
                        token.span,
                        "unbalanced parentheses: '(' is never closed".to_string(),
                    )),
                }
            }
            other => Err(token_err(
                self.expr,
                token.span,
                format!("expected a number, load case or '(' but found {}", other.describe()),
            )),
        }
    }
}

// ── Evaluation ─────────────────────────────────────────────────

enum Value {
    Number(f64),
    Term(Term),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Term(term) => term.kind(),
        }
    }
}

struct TreeEvaluator<'a> {
    expr: &'a str,
    bindings: HashMap<&'a str, ScaledTerm>,
}

impl TreeEvaluator<'_> {
    fn eval(&self, node: &Node) -> ComboResult<Value> {
        match node {
            Node::Number(n) => Ok(Value::Number(*n)),
            Node::Ident(name) => self
                .bindings
                .get(name.as_str())
                .cloned()
                .map(|term| Value::Term(Term::Scaled(term)))
                .ok_or_else(|| ComboError::expression_at(self.expr, name, "load case is not bound")),
            Node::Mul(lhs, rhs) => match (self.eval(lhs)?, self.eval(rhs)?) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                (Value::Number(a), Value::Term(term)) => term.scale(a).map(Value::Term),
                (lhs, rhs) => Err(ComboError::composition("*", lhs.kind(), rhs.kind())),
            },
            Node::And(lhs, rhs) => match (self.eval(lhs)?, self.eval(rhs)?) {
                (Value::Term(a), Value::Term(b)) => a.and_(b).map(Value::Term),
                (lhs, rhs) => Err(ComboError::composition("&", lhs.kind(), rhs.kind())),
            },
            Node::Or(lhs, rhs) => match (self.eval(lhs)?, self.eval(rhs)?) {
                (Value::Term(a), Value::Term(b)) => a.or_(b).map(Value::Term),
                (lhs, rhs) => Err(ComboError::composition("|", lhs.kind(), rhs.kind())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(expr: &str) -> Vec<String> {
        parse_identifiers(expr).unwrap()
    }

    #[test]
    fn test_identifiers_in_first_appearance_order() {
        assert_eq!(ids("1.2*D & 1.6*L & 0.5*(Lr|S|R)"), ["D", "L", "Lr", "S", "R"]);
        assert_eq!(ids("(D)"), ["D"]);
        assert_eq!(ids("1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W) & 1.1*1.3*1.4*X"), ["D", "Lr", "S", "R", "L", "W", "X"]);
    }

    #[test]
    fn test_identifiers_deduplicated() {
        assert_eq!(ids("D & (D | L) & L"), ["D", "L"]);
    }

    #[test]
    fn test_numeric_literals() {
        assert!(is_numeric_literal("1.2"));
        assert!(is_numeric_literal(".5"));
        assert!(is_numeric_literal("1."));
        assert!(is_numeric_literal("12"));
        assert!(!is_numeric_literal(""));
        assert!(!is_numeric_literal("X"));
        assert!(!is_numeric_literal("-1"));
        assert!(!is_numeric_literal("1e3"));
    }

    #[test]
    fn test_identifier_syntax() {
        assert!(is_identifier("D"));
        assert!(is_identifier("_wind_2"));
        assert!(!is_identifier("2W"));
        assert!(!is_identifier("W-1"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_non_numeric_left_operand() {
        let err = parse_identifiers("1.2 * D & X * (S | Lr | R)").unwrap_err();
        match err {
            ComboError::Expression { fragment, .. } => assert_eq!(fragment.as_deref(), Some("X *")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_plus_rejected() {
        assert!(parse_identifiers("1.2*D + 1.6*(Lr | S | R) + (L | 0.5*W)").is_err());
    }

    #[test]
    fn test_parenthesized_number_rejected() {
        assert!(parse_identifiers("1.2*D & 1.1*(1.3)*1.4*X").is_err());
    }

    #[test]
    fn test_unbalanced_parentheses() {
        for expr in [
            "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W",
            "1.2*D & 1.6*(Lr | S | R) & L | 0.5*W)",
            "1.2*D & 1.6*(Lr | S | R & (L | 0.5*W)",
            "1.2*D & 1.6*Lr | S | R) & (L | 0.5*W)",
        ] {
            let err = parse_identifiers(expr).unwrap_err();
            assert_eq!(err.error_code(), "EXPRESSION_ERROR", "{}", expr);
        }
    }

    #[test]
    fn test_dangling_operators() {
        for expr in ["D & L &", "D |", "(D & )", "& D", "1.2 *"] {
            assert!(parse_identifiers(expr).is_err(), "{}", expr);
        }
    }

    #[test]
    fn test_empty_expression() {
        assert!(parse_identifiers("").is_err());
        assert!(parse_identifiers("   ").is_err());
    }

    #[test]
    fn test_double_dot_number_rejected_structurally() {
        // Passes the operand check, fails tokenization
        assert!(parse_identifiers("1.2.3*D").is_err());
    }

    #[test]
    fn test_operator_precedence() {
        // '&' binds tighter than '|'
        let tree = syntax_tree("A | B & C").unwrap();
        assert!(matches!(tree, Node::Or(_, ref rhs) if matches!(**rhs, Node::And(_, _))));
        // '*' binds tighter than '&'
        let tree = syntax_tree("2*A & B").unwrap();
        assert!(matches!(tree, Node::And(ref lhs, _) if matches!(**lhs, Node::Mul(_, _))));
    }

    #[test]
    fn test_evaluate_number_chain_folds() {
        let expr = "1.1*1.3*1.4*X";
        let term = evaluate(expr, &ids(expr)).unwrap();
        match term {
            Term::Scaled(t) => assert_eq!(t.factor, 1.1 * 1.3 * 1.4),
            other => panic!("expected a scaled term, got {}", other.kind()),
        }
    }

    #[test]
    fn test_evaluate_rejects_dangling_and_after_combination() {
        let expr = "1.2*D & 1.6*(Lr | S | R) & (L | 0.5*W) & 1.4*X";
        let identifiers = ids(expr);
        let err = evaluate(expr, &identifiers).unwrap_err();
        match err {
            ComboError::Expression { expr: source, reason, .. } => {
                assert_eq!(source, expr);
                assert!(reason.contains("Combination & ScaledTerm"), "{}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_evaluate_rejects_bare_number() {
        assert!(evaluate("1.4", &[]).is_err());
        assert!(evaluate("1.4 & D", &["D".to_string()]).is_err());
    }

    #[test]
    fn test_evaluate_rejects_unbound_identifier() {
        let err = evaluate("D & L", &["D".to_string()]).unwrap_err();
        assert!(matches!(err, ComboError::Expression { fragment: Some(ref f), .. } if f == "L"));
    }
}
