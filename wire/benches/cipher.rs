use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wire::cipher::{decrypt, encrypt};

fn bench_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("chained_xor");
    for size in [4 * 1024usize, 256 * 1024, 4 * 1024 * 1024] {
        let data: Vec<u8> = (0..size).map(|i| (i * 31 % 251) as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encrypt_{size}"), |b| {
            let mut buf = data.clone();
            b.iter(|| encrypt(black_box(&mut buf)));
        });
        group.bench_function(format!("decrypt_{size}"), |b| {
            let mut buf = data.clone();
            b.iter(|| decrypt(black_box(&mut buf)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cipher);
criterion_main!(benches);
