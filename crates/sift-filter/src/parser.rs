//! Recursive parser from tokens to a [`Filter`].
//!
//! Each nesting level is parsed on its own token span. The first `AND`/`OR`
//! at a level decides that level's logic (AND when there is none); every
//! condition and parenthesized span at the level becomes a child of one group
//! with that logic. A later, disagreeing keyword at the same level is logged
//! and otherwise ignored, so `[A] EQ 1 AND [B] EQ 2 OR [C] EQ 3` is an AND of
//! three conditions. Use parentheses to mix logic.

use tracing::{trace, warn};

use crate::coerce::coerce;
use crate::error::{Result, SyntaxError};
use crate::filter::{Condition, Filter, NodeId, MAX_DEPTH};
use crate::op::Logic;
use crate::token::{tokenize, Token, TokenKind};

/// Parses filter text into a filter.
///
/// Empty (or blank) text yields an empty filter.
///
/// # Example
///
/// ```
/// use sift_filter::parse;
///
/// let filter = parse("[Age] gte 18 and ([Name] contains 'Jo' or [Name] isnull)").unwrap();
/// assert_eq!(
///     filter.to_string(),
///     r#"[Age] GTE 18 AND ([Name] CONTAINS "Jo" OR [Name] ISNULL)"#
/// );
/// ```
pub fn parse(text: &str) -> Result<Filter> {
    let tokens = tokenize(text)?;
    parse_tokens(&tokens)
}

/// Parses an already tokenized filter.
pub fn parse_tokens(tokens: &[Token<'_>]) -> Result<Filter> {
    let mut filter = Filter::new();
    if tokens.is_empty() {
        return Ok(filter);
    }
    let root = parse_level(&mut filter, tokens, 1)?;
    filter.set_root(root);
    trace!(
        conditions = filter.conditions().len(),
        depth = filter.depth(),
        "parsed filter"
    );
    Ok(filter)
}

fn parse_level(
    filter: &mut Filter,
    tokens: &[Token<'_>],
    depth: usize,
) -> std::result::Result<NodeId, SyntaxError> {
    if depth > MAX_DEPTH {
        return Err(SyntaxError::TooDeep {
            max: MAX_DEPTH,
            offset: tokens.first().map_or(0, |t| t.span.start),
        });
    }

    let logic = dominant_logic(tokens);
    let group = filter.alloc_group(logic);

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::GroupOpen => {
                let close = matching_close(tokens, i)?;
                let child = parse_level(filter, &tokens[i + 1..close], depth + 1)?;
                filter.attach(group, child);
                i = close + 1;
            }
            TokenKind::Field => {
                let (condition, consumed) = parse_condition(&tokens[i..])?;
                let child = filter.alloc_condition(condition);
                filter.attach(group, child);
                i += consumed;
            }
            TokenKind::Logic(found) => {
                if found != logic {
                    warn!(
                        offset = token.span.start,
                        dominant = %logic,
                        ignored = %found,
                        "mixed AND/OR at one nesting level; use parentheses to mix logic"
                    );
                }
                i += 1;
            }
            TokenKind::GroupClose => {
                return Err(SyntaxError::UnopenedGroup {
                    offset: token.span.start,
                })
            }
            TokenKind::Operator(_) | TokenKind::Literal(_) => {
                return Err(SyntaxError::ExpectedLogic {
                    found: token.text.to_string(),
                    offset: token.span.start,
                })
            }
        }
    }

    Ok(group)
}

/// First logic keyword at the top level of `tokens`; AND when there is none.
fn dominant_logic(tokens: &[Token<'_>]) -> Logic {
    let mut depth = 0usize;
    for token in tokens {
        match token.kind {
            TokenKind::GroupOpen => depth += 1,
            TokenKind::GroupClose => depth = depth.saturating_sub(1),
            TokenKind::Logic(logic) if depth == 0 => return logic,
            _ => {}
        }
    }
    Logic::And
}

/// Index of the `)` that closes the `(` at `open`.
fn matching_close(tokens: &[Token<'_>], open: usize) -> std::result::Result<usize, SyntaxError> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::GroupOpen => depth += 1,
            TokenKind::GroupClose => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(SyntaxError::UnclosedGroup {
        offset: tokens[open].span.start,
    })
}

/// Parses `field op [literal]` at the start of `tokens`.
///
/// Returns the condition and the number of tokens consumed.
fn parse_condition(tokens: &[Token<'_>]) -> std::result::Result<(Condition, usize), SyntaxError> {
    let field = &tokens[0];
    let op = match tokens.get(1).map(|t| t.kind) {
        Some(TokenKind::Operator(op)) => op,
        _ => {
            return Err(SyntaxError::MissingOperator {
                field: field.text.to_string(),
                offset: field.span.start,
            })
        }
    };

    let literal = match tokens.get(2) {
        Some(token) if op.takes_value() && matches!(token.kind, TokenKind::Literal(_)) => {
            Some(token)
        }
        _ => None,
    };

    let value = literal.map(|token| coerce(token.text)).transpose()?;
    let condition = Condition {
        field: field.text.to_string(),
        op,
        value,
    };
    Ok((condition, if literal.is_some() { 3 } else { 2 }))
}
