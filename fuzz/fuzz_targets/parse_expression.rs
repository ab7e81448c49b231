#![no_main]

use libfuzzer_sys::fuzz_target;
use mysqlx_client::crud::{ExprParser, Placeholders};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut placeholders = Placeholders::default();
    if let Ok(parser) = ExprParser::new(text, &mut placeholders) {
        let _ = parser.parse_expr();
    }
    let mut placeholders = Placeholders::default();
    if let Ok(parser) = ExprParser::new(text, &mut placeholders) {
        let _ = parser.parse_order_list();
    }
});
