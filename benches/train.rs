use brill::{
    rule::presets,
    tagger::{DefaultTagger, LookupTagger},
    trainer::{Trainer, TrainerOptions},
    types::{untag, Sentence, Token},
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

/// A synthetic corpus in which the tag of ambiguous words depends on the preceding tag.
fn corpus(n_sentences: usize) -> Vec<Sentence> {
    let nouns = ["dog", "walk", "run", "cat", "fish"];
    let verbs = ["walk", "run", "fish", "bark", "sleep"];
    let mut state: u64 = 42;
    let mut next = move |n: usize| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as usize % n
    };

    (0..n_sentences)
        .map(|_| {
            let mut sentence = Vec::new();
            for _ in 0..1 + next(3) {
                sentence.push(Token::new("the", "DT"));
                sentence.push(Token::new(nouns[next(nouns.len())], "NN"));
                if next(2) == 0 {
                    sentence.push(Token::new("to", "TO"));
                }
                sentence.push(Token::new(verbs[next(verbs.len())], "VB"));
            }
            sentence.push(Token::new(".", "."));
            sentence
        })
        .collect()
}

fn train_fast(c: &mut Criterion) {
    let gold = corpus(500);
    let templates = presets::brill24().unwrap();
    let initial = LookupTagger::train(&gold, DefaultTagger::new("NN"));
    let options = TrainerOptions {
        max_rules: 20,
        deterministic: true,
        ..TrainerOptions::default()
    };
    let trainer = Trainer::new(initial, &templates, options).unwrap();

    c.bench_function("train brill24", |b| b.iter(|| trainer.train(&gold).unwrap()));
}

fn tag(c: &mut Criterion) {
    let gold = corpus(500);
    let templates = presets::brill24().unwrap();
    let initial = LookupTagger::train(&gold, DefaultTagger::new("NN"));
    let tagger = Trainer::new(initial, &templates, TrainerOptions::default())
        .unwrap()
        .train(&gold)
        .unwrap();
    let words: Vec<Vec<&str>> = gold.iter().map(|x| untag(x)).collect();

    c.bench_function("tag corpus", |b| b.iter(|| tagger.tag_sents(&words)));
}

fn no_warmup_criterion() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .warm_up_time(Duration::from_nanos(1))
}

criterion_group!(
name = train;
config = no_warmup_criterion();
targets =
    train_fast,
    tag,
);

criterion_main!(train);
