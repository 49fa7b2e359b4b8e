//! Token-bounded text chunking with exact character-offset preservation.
//! Segmentation happens at line boundaries so a chunk boundary never
//! falls inside a line; overlap between consecutive chunks is computed
//! from the tokenizer's own byte offsets so the "extend left to
//! whitespace" rule lands on a real word boundary.

use std::sync::OnceLock;

use common::error::AppError;
use tokenizers::Tokenizer;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub content: String,
    pub char_start: usize,
    pub char_end: usize,
    pub chunk_index: usize,
    pub token_count: usize,
}

fn get_tokenizer() -> Result<&'static Tokenizer, AppError> {
    static TOKENIZER: OnceLock<Result<Tokenizer, String>> = OnceLock::new();

    match TOKENIZER.get_or_init(|| {
        Tokenizer::from_pretrained("bert-base-cased", None)
            .map_err(|e| format!("failed to initialize tokenizer: {e}"))
    }) {
        Ok(tokenizer) => Ok(tokenizer),
        Err(err) => Err(AppError::Internal(err.clone())),
    }
}

fn count_tokens(tokenizer: &Tokenizer, text: &str) -> Result<usize, AppError> {
    if text.is_empty() {
        return Ok(0);
    }
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| AppError::Internal(format!("tokenizer encode failed: {e}")))?;
    Ok(encoding.len())
}

/// Byte offsets of each `\n`-terminated line in `text`, in emission order.
fn line_segments(text: &str) -> Vec<(usize, &str)> {
    let mut segments = Vec::new();
    let mut offset = 0;
    for segment in text.split_inclusive('\n') {
        segments.push((offset, segment));
        offset += segment.len();
    }
    segments
}

/// Moves `pos` left until the character immediately preceding it is
/// whitespace, or `floor` is reached. Keeps overlap windows from
/// starting mid-word.
fn extend_left_to_whitespace(text: &str, mut pos: usize, floor: usize) -> usize {
    while pos > floor {
        match text[..pos].char_indices().next_back() {
            Some((_, ch)) if ch.is_whitespace() => break,
            Some((idx, _)) => pos = idx,
            None => break,
        }
    }
    pos
}

/// Byte offset (absolute, within `text`) where the overlap window for
/// the next chunk should begin, computed from the tokenizer's own
/// per-token byte offsets over `content`.
fn overlap_start(
    tokenizer: &Tokenizer,
    text: &str,
    content: &str,
    content_start: usize,
    overlap_tokens: usize,
) -> Result<usize, AppError> {
    if overlap_tokens == 0 || content.is_empty() {
        return Ok(content_start + content.len());
    }
    let encoding = tokenizer
        .encode(content, false)
        .map_err(|e| AppError::Internal(format!("tokenizer encode failed: {e}")))?;
    let offsets = encoding.get_offsets();
    if offsets.is_empty() {
        return Ok(content_start + content.len());
    }
    let take = offsets.len().min(overlap_tokens);
    let start_in_content = offsets[offsets.len() - take].0;
    let absolute = content_start + start_in_content;
    Ok(extend_left_to_whitespace(text, absolute, content_start))
}

/// Splits `text` into token-bounded, overlapping chunks.
/// Empty or whitespace-only input yields the empty sequence.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Result<Vec<ChunkSpan>, AppError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let tokenizer = get_tokenizer()?;
    let segments = line_segments(text);

    let mut chunks = Vec::new();
    let mut seg_idx = 0;
    let mut overlap_from: Option<usize> = None;

    while seg_idx < segments.len() {
        let chunk_start = overlap_from.unwrap_or(segments[seg_idx].0);

        let mut token_count = if let Some(ov_start) = overlap_from {
            count_tokens(tokenizer, &text[ov_start..segments[seg_idx].0])?
        } else {
            0
        };

        let mut acc_end = segments[seg_idx].0;
        let mut added_any = false;
        while seg_idx < segments.len() {
            let (seg_offset, seg_text) = segments[seg_idx];
            let seg_tokens = count_tokens(tokenizer, seg_text)?;
            if added_any && token_count + seg_tokens > config.chunk_size {
                break;
            }
            token_count += seg_tokens;
            acc_end = seg_offset + seg_text.len();
            seg_idx += 1;
            added_any = true;
        }

        let raw_content = &text[chunk_start..acc_end];
        let trimmed = raw_content.trim_end();
        if trimmed.is_empty() {
            if !added_any {
                break;
            }
            overlap_from = None;
            continue;
        }
        let char_end = chunk_start + trimmed.len();
        let final_token_count = count_tokens(tokenizer, trimmed)?;

        chunks.push(ChunkSpan {
            content: trimmed.to_string(),
            char_start: chunk_start,
            char_end,
            chunk_index: chunks.len(),
            token_count: final_token_count,
        });

        if seg_idx >= segments.len() {
            break;
        }

        overlap_from = Some(overlap_start(
            tokenizer,
            text,
            trimmed,
            chunk_start,
            config.chunk_overlap,
        )?);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_only_input_yields_no_chunks() {
        let config = ChunkerConfig::default();
        assert!(chunk_text("", &config).expect("chunk empty").is_empty());
        assert!(chunk_text("   \n\t  ", &config).expect("chunk whitespace").is_empty());
    }

    #[test]
    fn every_chunk_satisfies_the_position_fidelity_invariant() {
        let text = "Line one of the document.\n\
                     Line two follows right after.\n\
                     Line three wraps things up with a bit more text so the chunk has content.\n"
            .repeat(20);
        let config = ChunkerConfig {
            chunk_size: 40,
            chunk_overlap: 10,
        };
        let chunks = chunk_text(&text, &config).expect("chunk text");
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(&text[chunk.char_start..chunk.char_end], chunk.content);
            assert!(chunk.char_start < chunk.char_end);
            assert!(chunk.char_end <= text.len());
        }
    }

    #[test]
    fn chunk_indices_are_strictly_increasing_from_zero() {
        let text = "Alpha line.\nBeta line.\nGamma line.\nDelta line.\n".repeat(10);
        let config = ChunkerConfig {
            chunk_size: 10,
            chunk_overlap: 3,
        };
        let chunks = chunk_text(&text, &config).expect("chunk text");
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected);
        }
    }

    #[test]
    fn no_overlap_configuration_advances_strictly_without_repeated_content() {
        let text = "One.\nTwo.\nThree.\nFour.\nFive.\n".repeat(5);
        let config = ChunkerConfig {
            chunk_size: 5,
            chunk_overlap: 0,
        };
        let chunks = chunk_text(&text, &config).expect("chunk text");
        for pair in chunks.windows(2) {
            assert!(pair[1].char_start >= pair[0].char_end.min(pair[1].char_start));
        }
    }
}
