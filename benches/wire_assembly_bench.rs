//! Benchmarks for release message building and raw wire assembly
//!
//! Covers the per-request work on the burn path that does not touch the
//! network: compiling the release message, presigning, and assembling the
//! final two-signer transaction.

use bridge::tx_builder::{
    assemble_final, assemble_release, build_release_message, decode_message, presign_user,
    ReleaseParams, SIGNATURE_LEN,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};

fn release_params(user: &Keypair, custodian: &Keypair) -> ReleaseParams {
    ReleaseParams {
        user: user.pubkey(),
        custodian: custodian.pubkey(),
        nonce_account: Pubkey::new_unique(),
        nonce_blockhash: Hash::new_unique(),
        recipient: Pubkey::new_unique(),
        mint: Pubkey::new_unique(),
        amount: 1_000_000,
        decimals: 6,
    }
}

/// Benchmark: compile the release message
fn bench_build_release_message(c: &mut Criterion) {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let params = release_params(&user, &custodian);

    c.bench_function("build_release_message", |b| {
        b.iter(|| black_box(build_release_message(black_box(&params)).unwrap()));
    });
}

/// Benchmark: user presign over the serialized message
fn bench_presign_user(c: &mut Criterion) {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let message = build_release_message(&release_params(&user, &custodian)).unwrap();

    c.bench_function("presign_user", |b| {
        b.iter(|| black_box(presign_user(black_box(&message), &user)));
    });
}

/// Benchmark: decode, verify both signatures, assemble
fn bench_assemble_release(c: &mut Criterion) {
    let user = Keypair::new();
    let custodian = Keypair::new();
    let message = build_release_message(&release_params(&user, &custodian)).unwrap();
    let presign = presign_user(&message, &user);
    let custodian_signature = custodian.sign_message(&presign.message);

    c.bench_function("assemble_release", |b| {
        b.iter(|| {
            let decoded = decode_message(black_box(&presign.message)).unwrap();
            black_box(
                assemble_release(&decoded, &presign.signature, &custodian_signature).unwrap(),
            )
        });
    });
}

/// Benchmark: raw byte assembly across message sizes
fn bench_assemble_final_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble_final_message_size");
    let sig0 = [1u8; SIGNATURE_LEN];
    let sig1 = [2u8; SIGNATURE_LEN];

    for size in [128usize, 512, 1232].iter() {
        let message = vec![7u8; *size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &message, |b, message| {
            b.iter(|| black_box(assemble_final(black_box(message), &sig0, &sig1)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build_release_message,
    bench_presign_user,
    bench_assemble_release,
    bench_assemble_final_sizes,
);
criterion_main!(benches);
