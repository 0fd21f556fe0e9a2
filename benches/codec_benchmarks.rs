//! Performance Benchmarks for the ARC4 codec
//!
//! Run with: cargo bench

use avm_emu::arc4::{decode, encode, method_selector, Arc4Value, DecodePrefix, TypeDescriptor};
use avm_emu::ledger::{BoxStore, TypedBox};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// =============================================================================
// CODEC BENCHMARKS
// =============================================================================

fn string_array(len: usize) -> (TypeDescriptor, Arc4Value) {
    let ty = TypeDescriptor::dynamic_array(TypeDescriptor::Str);
    let value = Arc4Value::List((0..len).map(|i| Arc4Value::from(format!("item-{}", i))).collect());
    (ty, value)
}

fn bench_encode_string_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_string_array");

    for len in [4usize, 32, 128] {
        let (ty, value) = string_array(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &(ty, value), |b, (ty, value)| {
            b.iter(|| encode(value, ty).unwrap())
        });
    }

    group.finish();
}

fn bench_decode_string_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_string_array");

    for len in [4usize, 32, 128] {
        let (ty, value) = string_array(len);
        let bytes = encode(&value, &ty).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &(ty, bytes), |b, (ty, bytes)| {
            b.iter(|| decode(bytes, ty, DecodePrefix::None).unwrap())
        });
    }

    group.finish();
}

fn bench_bool_packing(c: &mut Criterion) {
    let ty = TypeDescriptor::static_array(TypeDescriptor::Bool, 256);
    let value = Arc4Value::List((0..256).map(|i| Arc4Value::Bool(i % 3 == 0)).collect());

    c.bench_function("encode_bool_array_256", |b| b.iter(|| encode(&value, &ty).unwrap()));
}

fn bench_method_selector(c: &mut Criterion) {
    c.bench_function("method_selector", |b| {
        b.iter(|| method_selector("swap((uint64,address),uint64[],string)uint128"))
    });
}

// =============================================================================
// BOX BENCHMARKS
// =============================================================================

fn bench_typed_box_read(c: &mut Criterion) {
    let ty = TypeDescriptor::static_array(TypeDescriptor::uint64(), 64);
    let value = Arc4Value::List((0..64u64).map(Arc4Value::from).collect());
    let mut store = BoxStore::new();
    let b = TypedBox::new(b"data", ty);
    b.set_native(&mut store, value).unwrap();

    c.bench_function("typed_box_cached_read", |bench| bench.iter(|| b.value(&mut store).unwrap()));
}

criterion_group!(
    codec_benches,
    bench_encode_string_array,
    bench_decode_string_array,
    bench_bool_packing,
);

criterion_group!(box_benches, bench_method_selector, bench_typed_box_read);

criterion_main!(codec_benches, box_benches);
