use super::ModelError;
use crate::core::io::checkpoint::ModelInfo;
use std::collections::HashMap;

/// Token vocabulary of a trained model, validated against its metadata.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    start: usize,
    end: usize,
    pad: usize,
    longest_token: usize,
}

impl Vocabulary {
    pub fn from_info(info: &ModelInfo) -> Result<Self, ModelError> {
        let size = info.vocab.len();
        if info.char_to_idx.len() != size {
            return Err(ModelError::InconsistentVocabulary(format!(
                "char_to_idx has {} entries for a vocabulary of {}",
                info.char_to_idx.len(),
                size
            )));
        }

        let mut tokens: Vec<Option<String>> = vec![None; size];
        for symbol in &info.vocab {
            let &idx = info.char_to_idx.get(symbol).ok_or_else(|| {
                ModelError::InconsistentVocabulary(format!("symbol '{symbol}' has no index"))
            })?;
            if idx >= size {
                return Err(ModelError::InconsistentVocabulary(format!(
                    "symbol '{symbol}' maps to index {idx}, outside 0..{size}"
                )));
            }
            if tokens[idx].is_some() {
                return Err(ModelError::InconsistentVocabulary(format!(
                    "index {idx} is assigned to more than one symbol"
                )));
            }
            if let Some(back) = info.idx_to_char.get(&idx.to_string()) {
                if back != symbol {
                    return Err(ModelError::InconsistentVocabulary(format!(
                        "idx_to_char[{idx}] is '{back}' but char_to_idx['{symbol}'] is {idx}"
                    )));
                }
            } else {
                return Err(ModelError::InconsistentVocabulary(format!(
                    "idx_to_char has no entry for index {idx}"
                )));
            }
            tokens[idx] = Some(symbol.clone());
        }
        let tokens: Vec<String> = tokens.into_iter().flatten().collect();
        if tokens.len() != size {
            return Err(ModelError::InconsistentVocabulary(
                "vocabulary contains duplicate symbols".to_string(),
            ));
        }

        let special = |name: &str| {
            info.char_to_idx
                .get(name)
                .copied()
                .ok_or_else(|| ModelError::MissingSpecialToken(name.to_string()))
        };
        let start = special(&info.start_token)?;
        let end = special(&info.end_token)?;
        let pad = special(&info.pad_token)?;

        let longest_token = tokens
            .iter()
            .map(|t| t.chars().count())
            .max()
            .unwrap_or(0);

        Ok(Self {
            index: info.char_to_idx.clone(),
            tokens,
            start,
            end,
            pad,
            longest_token,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn end_index(&self) -> usize {
        self.end
    }

    pub fn pad_index(&self) -> usize {
        self.pad
    }

    pub fn is_special(&self, index: usize) -> bool {
        index == self.start || index == self.end || index == self.pad
    }

    /// Splits `input` into token indices, always taking the longest vocabulary symbol that
    /// matches at the current position. Special tokens never match.
    pub fn tokenize(&self, input: &str) -> Result<Vec<usize>, ModelError> {
        let chars: Vec<char> = input.chars().collect();
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            let max_len = self.longest_token.min(chars.len() - pos);
            let matched = (1..=max_len).rev().find_map(|len| {
                let candidate: String = chars[pos..pos + len].iter().collect();
                self.index_of(&candidate)
                    .filter(|&idx| !self.is_special(idx))
                    .map(|idx| (idx, len))
            });
            let Some((idx, len)) = matched else {
                return Err(ModelError::UnknownSymbol {
                    input: input.to_string(),
                    position: pos,
                });
            };
            out.push(idx);
            pos += len;
        }
        Ok(out)
    }

    /// Concatenates the symbols of `indices`, skipping special tokens.
    pub fn detokenize(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter(|&&i| !self.is_special(i))
            .filter_map(|&i| self.token(i))
            .collect()
    }
}
