use criterion::{black_box, criterion_group, criterion_main, Criterion};
use landgrab_crypto::{keccak256, LegacyTransaction, VerifierKey};
use landgrab_types::Address;

fn keccak_256b_bench(c: &mut Criterion) {
    let data = [0xABu8; 256];

    c.bench_function("keccak256_256B", |b| b.iter(|| keccak256(black_box(&data))));
}

fn sign_digest_bench(c: &mut Criterion) {
    let key = VerifierKey::from_bytes(&[7u8; 32]).unwrap();
    let digest = keccak256(b"bench");

    c.bench_function("secp256k1_sign_digest", |b| {
        b.iter(|| key.sign_digest(black_box(&digest)).unwrap())
    });
}

fn sign_transaction_bench(c: &mut Criterion) {
    let key = VerifierKey::from_bytes(&[7u8; 32]).unwrap();
    let tx = LegacyTransaction {
        nonce: 1,
        gas_price: 1_000_000_000,
        gas_limit: 500_000,
        to: Address::new([0x11; 20]),
        value: 0,
        data: vec![0x42; 356],
        chain_id: 31337,
    };

    c.bench_function("legacy_tx_sign", |b| b.iter(|| tx.sign(black_box(&key)).unwrap()));
}

criterion_group!(
    benches,
    keccak_256b_bench,
    sign_digest_bench,
    sign_transaction_bench
);
criterion_main!(benches);
