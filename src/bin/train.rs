use brill::{
    rule::{presets, record::write_rules, RuleFormat},
    tagger::{DefaultTagger, LookupTagger},
    trainer::{Trainer, TrainerOptions},
    types::{untag, Sentence, Token},
    Error, Persist,
};
use clap::Parser;
use fs_err::File;
use std::{
    io::{self, BufRead, BufReader, BufWriter},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[clap(version, about = "Learns transformation rules from a tagged corpus")]
struct Opts {
    /// Corpus with one sentence per line of whitespace separated `word/TAG` tokens.
    corpus: PathBuf,
    /// Template preset: `nltkdemo18`, `brill24` or `fntbl37`.
    #[clap(long, short, default_value = "brill24")]
    templates: String,
    /// JSON file with trainer options. Flags take precedence.
    #[clap(long)]
    config: Option<PathBuf>,
    #[clap(long)]
    max_rules: Option<usize>,
    #[clap(long)]
    min_score: Option<i64>,
    #[clap(long)]
    min_acc: Option<f64>,
    #[clap(long)]
    deterministic: bool,
    /// `str`, `repr` or `verbose`.
    #[clap(long)]
    rule_format: Option<RuleFormat>,
    /// Tag for words the lookup tagger has not seen.
    #[clap(long, default_value = "NN")]
    default_tag: String,
    /// Fraction of sentences held out for testing.
    #[clap(long, default_value = "0")]
    test_fraction: f64,
    /// Writes the learned rules as JSON.
    #[clap(long)]
    rules_out: Option<PathBuf>,
    /// Writes the tagger in binary format.
    #[clap(long)]
    tagger_out: Option<PathBuf>,
}

fn read_corpus(path: &Path) -> Result<Vec<Sentence>, Error> {
    let reader = BufReader::new(File::open(path)?);
    let mut sentences = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let sentence = line
            .split_whitespace()
            .map(|token| match token.rfind('/') {
                Some(i) if i > 0 && i + 1 < token.len() => {
                    Ok(Token::new(&token[..i], &token[i + 1..]))
                }
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected `word/TAG`, found `{}`", token),
                )),
            })
            .collect::<Result<Sentence, _>>()?;

        if !sentence.is_empty() {
            sentences.push(sentence);
        }
    }

    Ok(sentences)
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let opts = Opts::parse();

    let mut options: TrainerOptions = match &opts.config {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => TrainerOptions::default(),
    };
    options.max_rules = opts.max_rules.unwrap_or(options.max_rules);
    options.min_score = opts.min_score.unwrap_or(options.min_score);
    options.min_acc = opts.min_acc.or(options.min_acc);
    options.deterministic |= opts.deterministic;
    options.rule_format = opts.rule_format.unwrap_or(options.rule_format);

    let corpus = read_corpus(&opts.corpus)?;
    let n_test = (corpus.len() as f64 * opts.test_fraction.max(0.0).min(1.0)) as usize;
    let (train, test) = corpus.split_at(corpus.len() - n_test);

    let templates = presets::by_name(&opts.templates)?;
    let initial = LookupTagger::train(train, DefaultTagger::new(opts.default_tag.as_str()));
    let trainer = Trainer::new(initial, &templates, options.clone())?;
    let tagger = trainer.train(train)?;

    for rule in tagger.rules() {
        println!("{}", rule.format(options.rule_format));
    }
    println!();

    let test_stats = if test.is_empty() {
        None
    } else {
        let words: Vec<Vec<&str>> = test.iter().map(|x| untag(x)).collect();
        Some(tagger.batch_tag_incremental(&words, test).1)
    };

    if let Some(statistics) = tagger.template_statistics(&templates, test_stats.as_ref()) {
        print!("{}", statistics);
    }

    if let Some(path) = &opts.rules_out {
        write_rules(BufWriter::new(File::create(path)?), tagger.rules())?;
    }
    if let Some(path) = &opts.tagger_out {
        tagger.save(path)?;
    }

    Ok(())
}
