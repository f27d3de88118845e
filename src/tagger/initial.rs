use super::InitialTagger;
use crate::types::{Sentence, Token};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Tags every word with the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultTagger {
    tag: String,
}

impl DefaultTagger {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        DefaultTagger { tag: tag.into() }
    }
}

impl InitialTagger for DefaultTagger {
    fn tag(&self, words: &[&str]) -> Vec<Token> {
        words
            .iter()
            .map(|word| Token::new(*word, self.tag.as_str()))
            .collect()
    }
}

/// Tags every known word with the tag it was seen with most often, other words with the backoff tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTagger<B = DefaultTagger> {
    table: FnvHashMap<String, String>,
    backoff: B,
}

impl<B: InitialTagger> LookupTagger<B> {
    /// Builds the lookup table from tagged sentences.
    /// Ties between equally frequent tags go to the smaller tag.
    pub fn train(sentences: &[Sentence], backoff: B) -> Self {
        let mut counts: FnvHashMap<&str, FnvHashMap<&str, usize>> = FnvHashMap::default();

        for token in sentences.iter().flatten() {
            *counts
                .entry(token.word())
                .or_default()
                .entry(token.tag())
                .or_default() += 1;
        }

        let table = counts
            .into_iter()
            .filter_map(|(word, tags)| {
                tags.into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(tag, _)| (word.to_string(), tag.to_string()))
            })
            .collect();

        LookupTagger { table, backoff }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<B: InitialTagger> InitialTagger for LookupTagger<B> {
    fn tag(&self, words: &[&str]) -> Vec<Token> {
        let mut tokens = self.backoff.tag(words);

        for (token, word) in tokens.iter_mut().zip(words) {
            if let Some(tag) = self.table.get(*word) {
                token.set_tag(tag.as_str());
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sentence;

    #[test]
    fn most_frequent_tag_wins() {
        let corpus = vec![
            sentence(&[("the", "DT"), ("run", "NN")]),
            sentence(&[("run", "VB"), ("run", "VB"), ("fast", "RB"), ("fast", "JJ")]),
        ];
        let tagger = LookupTagger::train(&corpus, DefaultTagger::new("NN"));
        let tags: Vec<_> = tagger
            .tag(&["the", "run", "fast", "dog"])
            .iter()
            .map(|x| x.tag().to_string())
            .collect();

        assert_eq!(tagger.len(), 3);
        assert_eq!(tags, vec!["DT", "VB", "JJ", "NN"]);
    }
}
