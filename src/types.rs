//! Fundamental types used by this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A word and the tag currently assigned to it.
/// The word is fixed once the token is created, the tag is rewritten by rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    word: String,
    tag: String,
}

impl Token {
    pub fn new<W: Into<String>, T: Into<String>>(word: W, tag: T) -> Self {
        Token {
            word: word.into(),
            tag: tag.into(),
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag<T: Into<String>>(&mut self, tag: T) {
        self.tag = tag.into();
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.word, self.tag)
    }
}

/// An ordered, tagged sequence of tokens.
pub type Sentence = Vec<Token>;

/// Identifies one token in a corpus by `(sentence index, token index)`.
/// Positions are ordered lexicographically.
pub type Position = (usize, usize);

/// Builds a sentence from `(word, tag)` pairs.
pub fn sentence(pairs: &[(&str, &str)]) -> Sentence {
    pairs
        .iter()
        .map(|(word, tag)| Token::new(*word, *tag))
        .collect()
}

/// The words of a tagged sentence.
pub fn untag(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|x| x.word()).collect()
}

/// Counts the tokens whose tag differs from the gold tag at the same position.
pub fn count_errors(tagged: &[Sentence], gold: &[Sentence]) -> usize {
    tagged
        .iter()
        .zip(gold)
        .flat_map(|(a, b)| a.iter().zip(b))
        .filter(|(a, b)| a.tag() != b.tag())
        .count()
}

/// Total number of tokens in a corpus.
pub fn count_tokens(sentences: &[Sentence]) -> usize {
    sentences.iter().map(|x| x.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_tag_can_be_rewritten() {
        let mut token = Token::new("run", "NN");
        token.set_tag("VB");

        assert_eq!(token.word(), "run");
        assert_eq!(token.tag(), "VB");
        assert_eq!(token.to_string(), "run/VB");
    }

    #[test]
    fn errors_are_counted_per_token() {
        let gold = vec![sentence(&[("a", "DT"), ("b", "NN")]), sentence(&[("c", "VB")])];
        let tagged = vec![sentence(&[("a", "DT"), ("b", "VB")]), sentence(&[("c", "NN")])];

        assert_eq!(count_errors(&tagged, &gold), 2);
        assert_eq!(count_errors(&gold, &gold), 0);
        assert_eq!(count_tokens(&gold), 3);
        assert_eq!(untag(&gold[0]), vec!["a", "b"]);
    }
}
