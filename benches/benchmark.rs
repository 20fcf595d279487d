use basin_topics::{
    text::stopwords::english_stopwords, DocFreq, GroupVectorizer, NormalizerConfig, TextNormalizer, VectorizerConfig,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

const WORDS: &[&str] = &[
    "water", "river", "basin", "dam", "treaty", "conflict", "cooperation", "sharing", "drought", "flood",
    "irrigation", "hydropower", "ministers", "agreement", "dispute", "border", "fishery", "rainfall", "the", "and",
    "of", "with", "was", "said", "government", "farmers", "reservoir", "downstream", "upstream", "talks",
];

fn synthetic_text(rng: &mut StdRng, n_words: usize) -> String {
    let mut text = String::with_capacity(n_words * 8);
    for i in 0..n_words {
        let w = WORDS[rng.gen_range(0..WORDS.len())];
        if i % 12 == 0 {
            // capitalized sentence start with a stray number and quote
            text.push_str(&format!("\u{201c}{}{}\u{201d} {} ", &w[..1].to_uppercase(), &w[1..], rng.gen_range(1990..2010)));
        } else {
            text.push_str(w);
            text.push(if i % 12 == 11 { '.' } else { ' ' });
            text.push(' ');
        }
    }
    text
}

fn normalization_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let text = synthetic_text(&mut rng, 50_000);
    let stopwords = english_stopwords();
    let normalizer = TextNormalizer::new(NormalizerConfig::default());

    c.bench_function("normalize_50k_words", |b| {
        b.iter(|| normalizer.normalize(black_box(&text), Some(&stopwords)))
    });
}

fn vectorization_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let n_docs = 400;
    let terms: Vec<Vec<String>> = (0..n_docs)
        .map(|_| {
            (0..500)
                .map(|_| WORDS[rng.gen_range(0..WORDS.len())].to_string())
                .collect()
        })
        .collect();
    let groups: Vec<String> = (0..n_docs).map(|i| format!("basin{}", i % 40)).collect();
    let config = VectorizerConfig {
        min_df: DocFreq::Count(1),
        max_df: DocFreq::Fraction(1.0),
        ..Default::default()
    };

    c.bench_function("group_vectorizer_fit_transform", |b| {
        b.iter(|| {
            let mut v: GroupVectorizer = GroupVectorizer::new(config.clone());
            v.fit_transform(black_box(&terms), black_box(&groups))
        })
    });
}

criterion_group!(benches, normalization_benchmark, vectorization_benchmark);
criterion_main!(benches);
