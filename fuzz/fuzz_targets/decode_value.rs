#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mysqlx_protocol::FieldType;

/// Column type plus a raw field payload.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    field_type: u32,
    fractional_digits: u32,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(field_type) = FieldType::from_u32(input.field_type) else {
        return;
    };
    let _ = mysqlx_types::decode_value(&input.data, field_type, input.fractional_digits);
});
