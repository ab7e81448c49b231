//! Property tests for the clause expression parser.

#![allow(clippy::unwrap_used)]

use mysqlx_client::crud::{ExprParser, Placeholders};
use mysqlx_protocol::{Expr, Scalar};
use proptest::prelude::*;

fn parse(text: &str, placeholders: &mut Placeholders) -> Result<Expr, mysqlx_client::CrudError> {
    ExprParser::new(text, placeholders)?.parse_expr()
}

proptest! {
    #[test]
    fn integer_literals_keep_their_value(v in any::<i64>()) {
        let mut placeholders = Placeholders::default();
        let expr = parse(&v.to_string(), &mut placeholders).unwrap();
        prop_assert_eq!(expr, Expr::Literal(Scalar::Sint(v)));
    }

    #[test]
    fn placeholders_number_by_first_use(names in proptest::collection::btree_set("[a-z][a-z0-9_]{0,6}", 1..8)) {
        let names: Vec<String> = names.into_iter().collect();
        // Every name twice: the second use must reuse the first position.
        let text = names
            .iter()
            .chain(names.iter())
            .map(|n| format!(":{n}"))
            .collect::<Vec<_>>()
            .join(" + ");
        let mut placeholders = Placeholders::default();
        parse(&text, &mut placeholders).unwrap();

        prop_assert_eq!(placeholders.len(), names.len());
        for (i, name) in names.iter().enumerate() {
            prop_assert_eq!(placeholders.position(name), u32::try_from(i).unwrap());
        }
    }

    #[test]
    fn parser_never_panics(text in "\\PC{0,40}") {
        let mut placeholders = Placeholders::default();
        let _ = parse(&text, &mut placeholders);
    }
}

#[test]
fn test_syntax_error_reports_offset() {
    let mut placeholders = Placeholders::default();
    let err = parse("a = = b", &mut placeholders).unwrap_err();
    assert!(matches!(err, mysqlx_client::CrudError::ExpressionSyntax { position: 4, .. }));
}
