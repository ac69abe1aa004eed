use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::lexer::{self, Token};
use crate::value::Value;

type Span = SimpleSpan;

/// Build the expression parser.
///
/// Precedence climbs from `||` (loosest) to unary operators (tightest); every
/// binary level is left-associative.
fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let value = select! {
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Bool(b) => Expr::Literal(Value::Bool(b)),
            Token::Ident(name) => Expr::Variable(name),
        }
        .labelled("value");

        let atom = value.or(expr.delimited_by(just(Token::LParen), just(Token::RParen)));

        let unary = choice((
            just(Token::Not).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
        ))
        .repeated()
        .foldr(atom, |op, rhs| Expr::Unary(op, Box::new(rhs)));

        let product = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
                just(Token::Percent).to(BinaryOp::Rem),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let sum = product.clone().foldl(
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            ))
            .then(product)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let comparison = sum.clone().foldl(
            choice((
                just(Token::LessEq).to(BinaryOp::LessEq),
                just(Token::GreaterEq).to(BinaryOp::GreaterEq),
                just(Token::Less).to(BinaryOp::Less),
                just(Token::Greater).to(BinaryOp::Greater),
            ))
            .then(sum)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let equality = comparison.clone().foldl(
            choice((
                just(Token::Eq).to(BinaryOp::Eq),
                just(Token::NotEq).to(BinaryOp::NotEq),
            ))
            .then(comparison)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        let conjunction = equality.clone().foldl(
            just(Token::And).to(BinaryOp::And).then(equality).repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        conjunction.clone().foldl(
            just(Token::Or).to(BinaryOp::Or).then(conjunction).repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        )
    })
}

/// Parse expression source into a tree.
///
/// Only the first lex or parse error is reported; expressions are one-liners
/// and a single message is what callers log.
pub fn parse_expr(source: &str) -> ExprResult<Expr> {
    if source.trim().is_empty() {
        return Err(ExprError::Empty);
    }

    let (tokens, lex_errors) = lexer::lex(source);
    if let Some(err) = lex_errors.into_iter().next() {
        return Err(ExprError::Syntax {
            span: err.span,
            message: err.message,
        });
    }

    let token_iter = tokens
        .iter()
        .map(|(tok, span)| (tok.clone(), Span::from(span.clone())));

    let len = source.len();
    let eoi: Span = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (output, errors) = expr_parser()
        .then_ignore(end())
        .parse(stream)
        .into_output_errors();

    if let Some(err) = errors.into_iter().next() {
        let span = err.span();
        return Err(ExprError::Syntax {
            span: span.into_range(),
            message: err.to_string(),
        });
    }

    output.ok_or(ExprError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Value::Number(n))
    }

    #[test]
    fn parse_single_variable() {
        assert_eq!(parse_expr("hasKey").unwrap(), var("hasKey"));
    }

    #[test]
    fn multiplication_binds_tighter() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                num(1.0),
                Expr::binary(BinaryOp::Mul, num(2.0), num(3.0))
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_expr("10 - 4 - 3").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Sub, num(10.0), num(4.0)),
                num(3.0)
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse_expr("a || b && c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Or,
                var("a"),
                Expr::binary(BinaryOp::And, var("b"), var("c"))
            )
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse_expr("(a || b) && c").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::And,
                Expr::binary(BinaryOp::Or, var("a"), var("b")),
                var("c")
            )
        );
    }

    #[test]
    fn stacked_unary() {
        let expr = parse_expr("!!done").unwrap();
        assert_eq!(
            expr,
            Expr::Unary(
                UnaryOp::Not,
                Box::new(Expr::Unary(UnaryOp::Not, Box::new(var("done"))))
            )
        );
    }

    #[test]
    fn comparison_chain() {
        let expr = parse_expr("gold >= 10 == true").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Eq,
                Expr::binary(BinaryOp::GreaterEq, var("gold"), num(10.0)),
                Expr::Literal(Value::Bool(true))
            )
        );
    }

    #[test]
    fn empty_source_is_error() {
        assert_eq!(parse_expr("   "), Err(ExprError::Empty));
    }

    #[test]
    fn trailing_operator_is_syntax_error() {
        assert!(matches!(parse_expr("a +"), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn unbalanced_parenthesis_is_syntax_error() {
        assert!(matches!(parse_expr("(a && b"), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn assignment_token_is_lex_error() {
        let err = parse_expr("= 3").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { span, .. } if span == (0..1)));
    }

    #[test]
    fn dangling_tokens_rejected() {
        assert!(parse_expr("a b").is_err());
    }
}
