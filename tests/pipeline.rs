use std::fs;
use std::path::Path;

use basin_topics::{
    tokenize_corpus, Corpus, CorpusBuilder, DocFreq, GroupTermMatrix, GroupVectorizer, LanguageModel, ModelType,
    NormalizerConfig, PipelineError, SweepOptions, SweepPlan, TermNormalize, TermsConfig, TopicModelSweep,
    VectorizerConfig, VectorizerData,
};
use ndarray::Array2;

fn write_raw(dir: &Path, files: &[(&str, &str)]) {
    for (name, text) in files {
        fs::write(dir.join(name), text).unwrap();
    }
}

fn nile_corpus(dir: &Path) -> Corpus {
    write_raw(
        dir,
        &[
            ("nile_2007.txt", "Water conflict rises along the Nile river."),
            ("nile_2007_07.txt", "Cooperation improves water sharing."),
        ],
    );
    let lm = LanguageModel::english();
    let builder = CorpusBuilder::new(&lm, NormalizerConfig::default(), Vec::<String>::new());
    builder.build(&dir.join("*.txt").to_string_lossy()).unwrap()
}

#[test]
fn nile_example_builds_two_documents() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = nile_corpus(dir.path());
    assert_eq!(corpus.n_docs(), 2);

    // sorted paths: nile_2007.txt before nile_2007_07.txt
    let first = &corpus.docs()[0];
    let second = &corpus.docs()[1];
    assert_eq!((first.basin.as_str(), first.year.as_str()), ("nile", "2007"));
    assert_eq!(first.month, None);
    assert_eq!(second.month.as_deref(), Some("07"));

    let tokens: Vec<&str> = corpus.iter().flat_map(|d| d.tokens.iter().map(String::as_str)).collect();
    for expected in ["water", "conflict", "river", "cooperation", "sharing"] {
        assert!(tokens.contains(&expected), "missing {expected} in {tokens:?}");
    }
    assert!(!tokens.contains(&"the"));
    assert!(tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())));
}

#[test]
fn malformed_file_name_aborts_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(
        dir.path(),
        &[("nile_2007.txt", "Water."), ("nile_2007_07_extra.txt", "More water.")],
    );
    let lm = LanguageModel::english();
    let builder = CorpusBuilder::new(&lm, NormalizerConfig::default(), Vec::<String>::new());
    let err = builder.build(&dir.path().join("*.txt").to_string_lossy()).unwrap_err();
    assert!(matches!(err, PipelineError::MetadataParse { parts: 4, .. }));
}

#[test]
fn corpus_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = nile_corpus(dir.path());
    let path = dir.path().join("processed").join("NILE_V1.bin.gz");
    corpus.save(&path).unwrap();
    let back = Corpus::load(&path).unwrap();
    assert_eq!(back.n_docs(), corpus.n_docs());
    assert_eq!(back.config(), corpus.config());
    assert_eq!(back.docs(), corpus.docs());
}

#[test]
fn features_feed_the_vectorizer_in_document_order() {
    let dir = tempfile::tempdir().unwrap();
    write_raw(
        dir.path(),
        &[
            ("nile_2007.txt", "Water conflict along the river. Water conflict again."),
            ("indus_2007.txt", "Water treaty signed. The treaty holds."),
            ("indus_2008.txt", "Treaty talks on water. Dam plans."),
        ],
    );
    let lm = LanguageModel::english();
    let corpus = CorpusBuilder::new(&lm, NormalizerConfig::default(), Vec::<String>::new())
        .build(&dir.path().join("*.txt").to_string_lossy())
        .unwrap();
    let config = TermsConfig { ngrams: (1, 1), min_freq: 1, normalize: TermNormalize::Text, ..Default::default() };
    let (terms, basins, years) = tokenize_corpus(&corpus, &lm, &config).unwrap().unzip();
    assert_eq!(basins, vec!["indus", "indus", "nile"]);
    assert_eq!(years, vec!["2007", "2008", "2007"]);
    assert_eq!(terms.len(), 3);

    let mut v: GroupVectorizer = GroupVectorizer::new(VectorizerConfig {
        apply_idf: false,
        norm: None,
        min_df: DocFreq::Count(1),
        max_df: DocFreq::Count(2),
        ..Default::default()
    });
    let m = v.fit_transform(&terms, &basins).unwrap();
    assert_eq!(m.shape().0, 2);
    assert_eq!(m.get(&v, "nile", "conflict"), Some(2.0));
    assert!(m.get(&v, "indus", "treaty").unwrap() >= 2.0);
    assert!(m.to_dense().iter().all(|&x| x >= 0.0));

    // persisted separately, both needed to query by name
    let vec_path = dir.path().join("v.cbor.gz");
    let mat_path = dir.path().join("m.cbor.gz");
    v.save(&vec_path).unwrap();
    m.save(&mat_path).unwrap();
    let v2: GroupVectorizer = GroupVectorizer::load(&vec_path).unwrap();
    let m2 = GroupTermMatrix::load(&mat_path).unwrap();
    assert_eq!(m2.get(&v2, "nile", "conflict"), Some(2.0));
}

#[test]
fn sweep_on_three_groups_by_fifty_terms() {
    let dense = Array2::from_shape_fn((3, 50), |(g, t)| ((g + 1) * (t % 7) + t / 10) as f64);
    let matrix = GroupTermMatrix::from_dense(&dense);
    let vectorizer: GroupVectorizer = VectorizerData {
        config: VectorizerConfig::default(),
        terms: (0..50).map(|t| format!("t{t:02}")).collect(),
        groups: vec!["indus".into(), "mekong".into(), "nile".into()],
        idf: vec![1.0; 50],
    }
    .into_vectorizer()
    .unwrap();

    let sweep = TopicModelSweep::new(SweepPlan::grid(&[ModelType::Nmf], &[2], &[10]), "V5");
    let report = sweep.run(&matrix, &vectorizer, &SweepOptions::default()).unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.failures.is_empty());
    let result = &report.results[0];
    assert_eq!(result.model_type, ModelType::Nmf);
    assert_eq!((result.n_topics, result.n_terms), (2, 10));
    assert_eq!(result.group_topic.dim(), (3, 2));
}
