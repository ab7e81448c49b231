//! Benchmarks for X Protocol encoding and decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use std::hint::black_box;

use bytes::{Bytes, BytesMut};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mysqlx_protocol::{
    ColumnMetaData, Decode, Encode, Expr, FieldType, Find, FrameHeader, Row, Scalar, StmtExecute,
    crud::{Collection, Limit},
    wire::{read_varint, write_varint},
};

fn bench_frame_header(c: &mut Criterion) {
    let header = FrameHeader::new(13, 1000).unwrap();
    let encoded = header.encode_to_bytes();

    c.bench_function("frame_header_decode", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            black_box(FrameHeader::decode(&mut cursor).unwrap())
        })
    });
}

fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    for value in [1u64, 300, u64::from(u32::MAX), u64::MAX] {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, value);
        let encoded = buf.freeze();
        group.bench_function(format!("decode_{value}"), |b| {
            b.iter(|| {
                let mut cursor = encoded.clone();
                black_box(read_varint(&mut cursor).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_row_decode(c: &mut Criterion) {
    let row = Row {
        fields: (0..16)
            .map(|i| Bytes::from(format!("value-{i}\0")))
            .collect(),
    };
    let encoded = row.encode_to_bytes();

    let mut group = c.benchmark_group("row");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("decode_16_fields", |b| {
        b.iter(|| black_box(Row::decode(encoded.clone()).unwrap()))
    });
    group.finish();
}

fn bench_column_metadata_decode(c: &mut Criterion) {
    let meta = ColumnMetaData {
        original_name: Some(Bytes::from_static(b"price")),
        table: Some(Bytes::from_static(b"products")),
        schema: Some(Bytes::from_static(b"shop")),
        fractional_digits: Some(2),
        ..ColumnMetaData::new(FieldType::Decimal, Bytes::from_static(b"price"))
    };
    let encoded = meta.encode_to_bytes();

    c.bench_function("column_metadata_decode", |b| {
        b.iter(|| black_box(ColumnMetaData::decode(encoded.clone()).unwrap()))
    });
}

fn bench_request_encode(c: &mut Criterion) {
    let stmt = StmtExecute::sql("SELECT * FROM t WHERE a = ? AND b = ?")
        .with_arg(Scalar::Sint(42))
        .with_arg(Scalar::string("abc"));
    c.bench_function("stmt_execute_encode", |b| {
        b.iter(|| black_box(stmt.encode_to_bytes()))
    });

    let find = Find {
        collection: Collection {
            name: "people".into(),
            schema: Some("test".into()),
        },
        criteria: Some(Expr::operator(
            "==",
            vec![Expr::Placeholder(0), Expr::Literal(Scalar::Uint(1))],
        )),
        limit: Some(Limit {
            row_count: 100,
            offset: None,
        }),
        args: vec![Scalar::Sint(7)],
        ..Find::default()
    };
    c.bench_function("crud_find_encode", |b| {
        b.iter(|| black_box(find.encode_to_bytes()))
    });
}

criterion_group!(
    benches,
    bench_frame_header,
    bench_varint,
    bench_row_decode,
    bench_column_metadata_decode,
    bench_request_encode,
);
criterion_main!(benches);
