use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fson_core::config::CodecConfig;
use fson_core::lexer::Lexer;
use fson_core::parser::Parser;
use fson_core::registry::{EnumDef, FieldDef, StructDef, TypeRegistry};
use fson_core::{Codec, JsonValue, ObjectRef, Value};
use std::sync::Arc;

// ============================================================================
// Test Data
// ============================================================================

const SMALL_JSON: &str = r#"{
    "name": "test",
    "version": 1.0,
    "enabled": true,
    "tags": ["a", "b", "c"]
}"#;

fn generate_items_json(array_size: usize) -> String {
    let mut json = String::from("{\n    \"items\": [\n");
    for i in 0..array_size {
        if i > 0 {
            json.push_str(",\n");
        }
        json.push_str(&format!(
            "        {{ \"id\": {}, \"name\": \"Item {}\", \"price\": {}.5, \"status\": \"{}\" }}",
            i,
            i,
            i * 100,
            if i % 2 == 0 { "Active" } else { "Retired" }
        ));
    }
    json.push_str("\n    ]\n}");
    json
}

fn codec() -> Codec {
    let registry = TypeRegistry::new();
    registry
        .register(EnumDef::new("Status", ["Active", "Retired"]))
        .expect("register Status");
    registry
        .register(
            StructDef::new("Item")
                .field(FieldDef::new("id", "int64"))
                .field(FieldDef::new("name", "string"))
                .field(FieldDef::new("price", "float64"))
                .field(FieldDef::new("status", "Status")),
        )
        .expect("register Item");
    registry
        .register(StructDef::new("Catalog").field(FieldDef::new("items", "list<Item>")))
        .expect("register Catalog");
    registry
        .register(
            StructDef::new("Node")
                .field(FieldDef::new("id", "int32"))
                .field(FieldDef::new("next", "Node")),
        )
        .expect("register Node");
    Codec::new(Arc::new(registry), CodecConfig::default())
}

fn catalog(codec: &Codec, size: usize) -> Value {
    let json = fson_core::parser::parse(&generate_items_json(size)).expect("valid catalog");
    codec
        .deserialize("Catalog", &json)
        .into_result()
        .expect("catalog reads")
}

fn ring(size: usize) -> Value {
    let first = ObjectRef::new("Node").with("id", 0);
    let mut current = first.clone();
    for i in 1..size {
        let next = ObjectRef::new("Node").with("id", i as i64);
        current.set("next", next.clone());
        current = next;
    }
    current.set("next", first.clone());
    Value::Object(first)
}

// ============================================================================
// Text Benchmarks
// ============================================================================

fn bench_lexer_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_array_scaling");
    for size in [10, 100, 1000] {
        let source = generate_items_json(size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| {
                let mut lexer = Lexer::new(black_box(src));
                lexer.lex()
            })
        });
    }
    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    c.bench_function("parser_small", |b| {
        b.iter(|| Parser::new(black_box(SMALL_JSON)).parse_document())
    });

    let mut group = c.benchmark_group("parser_array_scaling");
    for size in [10, 100, 1000] {
        let source = generate_items_json(size);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, src| {
            b.iter(|| Parser::new(black_box(src)).parse_document())
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let json: JsonValue = fson_core::parser::parse(&generate_items_json(500)).expect("valid");
    c.bench_function("render_compact_500", |b| b.iter(|| black_box(&json).render(0)));
    c.bench_function("render_pretty_500", |b| b.iter(|| black_box(&json).render(2)));
}

// ============================================================================
// Codec Benchmarks
// ============================================================================

fn bench_serialize_scaling(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("serialize_catalog");
    for size in [10, 100, 1000] {
        let value = catalog(&codec, size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &value, |b, v| {
            b.iter(|| codec.serialize("Catalog", black_box(v)))
        });
    }
    group.finish();
}

fn bench_deserialize_scaling(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("deserialize_catalog");
    for size in [10, 100, 1000] {
        let json = fson_core::parser::parse(&generate_items_json(size)).expect("valid");
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &json, |b, j| {
            b.iter(|| codec.deserialize("Catalog", black_box(j)))
        });
    }
    group.finish();
}

fn bench_cyclic_graph(c: &mut Criterion) {
    let codec = codec();
    let mut group = c.benchmark_group("cyclic_ring");
    for size in [10, 100] {
        let value = ring(size);
        let json = codec
            .serialize("Node", &value)
            .into_result()
            .expect("ring serializes");
        group.bench_with_input(BenchmarkId::new("serialize", size), &value, |b, v| {
            b.iter(|| codec.serialize("Node", black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("deserialize", size), &json, |b, j| {
            b.iter(|| codec.deserialize("Node", black_box(j)))
        });
    }
    group.finish();
}

criterion_group!(text_benches, bench_lexer_scaling, bench_parser, bench_render);
criterion_group!(
    codec_benches,
    bench_serialize_scaling,
    bench_deserialize_scaling,
    bench_cyclic_graph
);
criterion_main!(text_benches, codec_benches);
