use winnow::prelude::*;
use winnow::ascii::{digit0, digit1, multispace0};
use winnow::combinator::{alt, delimited, eof, opt, preceded};
use winnow::error::ParserError;
use winnow::token::{one_of, take_while};

use crate::expr_ast::*;

pub fn parse_expression(input: &str) -> Result<Expr, String> {
    let mut rest = input;
    let parsed = (|i: &mut &str| expression(i, 0), multispace0, eof).parse_next(&mut rest);
    match parsed {
        Ok((expr, _, _)) => Ok(expr),
        Err(_) => {
            let offset = input.len() - rest.len();
            let near: String = rest.chars().take(20).collect();
            if near.is_empty() {
                Err(format!("unexpected end of expression at offset {offset}"))
            } else {
                Err(format!("unexpected `{near}` at offset {offset}"))
            }
        }
    }
}

/// Nesting allowed below one expression: parentheses, unary operators,
/// ternary branches and operator chains each count one level.
const MAX_DEPTH: usize = 64;

fn within_depth(input: &&str, depth: usize) -> winnow::Result<()> {
    if depth > MAX_DEPTH {
        return Err(ParserError::from_input(input));
    }
    Ok(())
}

fn expression(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    within_depth(input, depth)?;
    conditional(input, depth)
}

fn conditional(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    let test = infix(input, 0, depth)?;
    let branches = opt((
        preceded((multispace0, '?'), |i: &mut &str| expression(i, depth + 1)),
        preceded((multispace0, ':'), |i: &mut &str| expression(i, depth + 1)),
    ))
    .parse_next(input)?;
    Ok(match branches {
        Some((then, otherwise)) => {
            Expr::Conditional(Box::new(test), Box::new(then), Box::new(otherwise))
        }
        None => test,
    })
}

/// Precedence climbing over the binary and logical operators.
fn infix(input: &mut &str, min_bp: u8, depth: usize) -> winnow::Result<Expr> {
    let mut lhs = unary(input, depth)?;
    let mut depth = depth;
    loop {
        let checkpoint = *input;
        multispace0.parse_next(input)?;
        let Some(op) = opt(infix_op).parse_next(input)? else {
            *input = checkpoint;
            break;
        };
        let (lbp, rbp) = op.binding_power();
        if lbp < min_bp {
            *input = checkpoint;
            break;
        }
        // Each operator deepens the tree built so far.
        depth += 1;
        within_depth(input, depth)?;
        let rhs = infix(input, rbp, depth)?;
        lhs = op.build(lhs, rhs);
    }
    Ok(lhs)
}

fn infix_op(input: &mut &str) -> winnow::Result<InfixOp> {
    alt((
        alt((
            "===".value(InfixOp::Binary(BinaryOp::StrictEq)),
            "!==".value(InfixOp::Binary(BinaryOp::StrictNe)),
            "==".value(InfixOp::Binary(BinaryOp::Eq)),
            "!=".value(InfixOp::Binary(BinaryOp::Ne)),
            "<=".value(InfixOp::Binary(BinaryOp::Le)),
            ">=".value(InfixOp::Binary(BinaryOp::Ge)),
            "&&".value(InfixOp::Logical(LogicalOp::And)),
            "||".value(InfixOp::Logical(LogicalOp::Or)),
        )),
        alt((
            "<".value(InfixOp::Binary(BinaryOp::Lt)),
            ">".value(InfixOp::Binary(BinaryOp::Gt)),
            "+".value(InfixOp::Binary(BinaryOp::Add)),
            "-".value(InfixOp::Binary(BinaryOp::Sub)),
            "*".value(InfixOp::Binary(BinaryOp::Mul)),
            "/".value(InfixOp::Binary(BinaryOp::Div)),
            "%".value(InfixOp::Binary(BinaryOp::Rem)),
        )),
    ))
    .parse_next(input)
}

fn unary(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    multispace0.parse_next(input)?;
    let op = opt(alt((
        '!'.value(UnaryOp::Not),
        '-'.value(UnaryOp::Neg),
        '+'.value(UnaryOp::Plus),
    )))
    .parse_next(input)?;
    match op {
        Some(op) => {
            within_depth(input, depth + 1)?;
            let operand = unary(input, depth + 1)?;
            Ok(Expr::Unary(op, Box::new(operand)))
        }
        None => primary(input, depth),
    }
}

fn primary(input: &mut &str, depth: usize) -> winnow::Result<Expr> {
    multispace0.parse_next(input)?;
    alt((
        number.map(|n| Expr::Literal(Literal::Number(n))),
        string_literal.map(|s| Expr::Literal(Literal::Str(s))),
        delimited(
            '(',
            |i: &mut &str| expression(i, depth + 1),
            (multispace0, ')'),
        ),
        word,
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> winnow::Result<f64> {
    let text = (digit1, opt(('.', digit0))).take().parse_next(input)?;
    text.parse::<f64>()
        .map_err(|_| ParserError::from_input(input))
}

fn string_literal(input: &mut &str) -> winnow::Result<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let text: &str = *input;
    let mut out = String::new();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            c if c == quote => {
                *input = &text[i + c.len_utf8()..];
                return Ok(out);
            }
            c => out.push(c),
        }
    }
    Err(ParserError::from_input(input))
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn word(input: &mut &str) -> winnow::Result<Expr> {
    let name = (one_of(is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)?;
    Ok(match name {
        "true" => Expr::Literal(Literal::Bool(true)),
        "false" => Expr::Literal(Literal::Bool(false)),
        "null" => Expr::Literal(Literal::Null),
        "undefined" => Expr::Literal(Literal::Undefined),
        _ => Expr::Ident(name.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.to_string()))
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(Literal::Number(n)))
    }

    #[test]
    fn parse_comparison() {
        assert_eq!(
            parse_expression("cpu > 80").unwrap(),
            Expr::Binary(BinaryOp::Gt, ident("cpu"), num(80.0))
        );
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_expression("a + b * 2").unwrap(),
            Expr::Binary(
                BinaryOp::Add,
                ident("a"),
                Box::new(Expr::Binary(BinaryOp::Mul, ident("b"), num(2.0)))
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse_expression("a - b - c").unwrap(),
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(BinaryOp::Sub, ident("a"), ident("b"))),
                ident("c")
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse_expression("a || b && c").unwrap(),
            Expr::Logical(
                LogicalOp::Or,
                ident("a"),
                Box::new(Expr::Logical(LogicalOp::And, ident("b"), ident("c")))
            )
        );
    }

    #[test]
    fn strict_equality_is_not_split() {
        assert_eq!(
            parse_expression("a === 1").unwrap(),
            Expr::Binary(BinaryOp::StrictEq, ident("a"), num(1.0))
        );
        assert_eq!(
            parse_expression("a !== 1").unwrap(),
            Expr::Binary(BinaryOp::StrictNe, ident("a"), num(1.0))
        );
    }

    #[test]
    fn parse_parentheses_and_unary() {
        assert_eq!(
            parse_expression("!(a < -1)").unwrap(),
            Expr::Unary(
                UnaryOp::Not,
                Box::new(Expr::Binary(
                    BinaryOp::Lt,
                    ident("a"),
                    Box::new(Expr::Unary(UnaryOp::Neg, num(1.0)))
                ))
            )
        );
    }

    #[test]
    fn parse_string_literals() {
        assert_eq!(
            parse_expression(r#"status == 'down' || name == "it\"s""#).unwrap(),
            Expr::Logical(
                LogicalOp::Or,
                Box::new(Expr::Binary(
                    BinaryOp::Eq,
                    ident("status"),
                    Box::new(Expr::Literal(Literal::Str("down".into())))
                )),
                Box::new(Expr::Binary(
                    BinaryOp::Eq,
                    ident("name"),
                    Box::new(Expr::Literal(Literal::Str("it\"s".into())))
                ))
            )
        );
    }

    #[test]
    fn parse_keywords() {
        assert_eq!(parse_expression("true").unwrap(), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse_expression(" null ").unwrap(), Expr::Literal(Literal::Null));
        assert_eq!(parse_expression("undefined").unwrap(), Expr::Literal(Literal::Undefined));
        assert_eq!(parse_expression("trueish").unwrap(), Expr::Ident("trueish".into()));
    }

    #[test]
    fn parse_decimal_number() {
        assert_eq!(parse_expression("3.25").unwrap(), Expr::Literal(Literal::Number(3.25)));
    }

    #[test]
    fn parse_ternary() {
        assert_eq!(
            parse_expression("a ? 1 : 2").unwrap(),
            Expr::Conditional(ident("a"), num(1.0), num(2.0))
        );
    }

    #[test]
    fn identifiers_allow_dollar_and_underscore() {
        assert_eq!(parse_expression("$cpu_load").unwrap(), Expr::Ident("$cpu_load".into()));
    }

    #[test]
    fn reject_trailing_garbage() {
        let err = parse_expression("a > 1 )").unwrap_err();
        assert!(err.contains("unexpected"), "got: {err}");
    }

    #[test]
    fn reject_assignment() {
        assert!(parse_expression("a = 1").is_err());
    }

    #[test]
    fn reject_unterminated_string() {
        assert!(parse_expression("name == 'abc").is_err());
    }

    #[test]
    fn moderate_nesting_parses() {
        let text = format!("{}a{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(parse_expression(&text).unwrap(), Expr::Ident("a".into()));
        assert!(parse_expression(&format!("{}a", "!".repeat(40))).is_ok());
    }

    #[test]
    fn reject_nesting_past_limit() {
        let parens = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(parse_expression(&parens).is_err());
        assert!(parse_expression(&format!("{}true", "!".repeat(1000))).is_err());
        assert!(parse_expression(&format!("{}1", "- ".repeat(1000))).is_err());
        assert!(parse_expression(&vec!["1"; 1000].join(" + ")).is_err());
        assert!(parse_expression(&format!("{}0", "a ? 1 : ".repeat(500))).is_err());
    }

    #[test]
    fn reject_empty_expression() {
        let err = parse_expression("   ").unwrap_err();
        assert!(err.contains("end of expression"), "got: {err}");
    }
}
