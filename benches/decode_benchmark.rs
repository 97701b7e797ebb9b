use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sptag::{ChainTagger, TagVocab, TransitionMatrix, UnaryPotentials};

struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f64 / (1u64 << 31) as f64) * 8.0 - 4.0
    }
}

fn synthetic_batch(num_tags: usize, batch: usize, max_len: usize) -> UnaryPotentials {
    let mut lcg = Lcg(7);
    let seqs: Vec<Vec<Vec<f64>>> = (0..batch)
        .map(|i| {
            let len = 1 + (i * 7) % max_len;
            (0..len)
                .map(|_| (0..num_tags).map(|_| lcg.next_f64()).collect())
                .collect()
        })
        .collect();
    UnaryPotentials::from_sequences(&seqs, num_tags).expect("bad batch")
}

fn decode_benchmark(c: &mut Criterion) {
    let num_tags = 16;
    let vocab = TagVocab::from((0..num_tags).map(|i| format!("T{}", i)).collect::<Vec<_>>());
    let mut lcg = Lcg(13);
    let weights = (0..num_tags * num_tags).map(|_| lcg.next_f64()).collect();
    let trans = TransitionMatrix::from_weights(num_tags, weights).expect("bad matrix");
    let mut tagger = ChainTagger::new(vocab, &trans).expect("bad tagger");
    let batch = synthetic_batch(num_tags, 32, 64);

    c.bench_function("decode_batch", |b| {
        b.iter(|| {
            tagger
                .infer(black_box(&batch), black_box(&trans))
                .expect("failed to decode")
        })
    });
}

criterion_group!(benchmarks, decode_benchmark);
criterion_main!(benchmarks);
