//! Property tests for boundary-aware chunking.

use docqa_rag::{BoundaryChunker, Chunk, Chunker, Document, chunk_text};
use proptest::prelude::*;

/// Text built from words, spaces, sentence ends, and paragraph breaks,
/// with the occasional multi-byte character.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            6 => "[a-zé]{1,12}",
            4 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("! ".to_string()),
            1 => Just("\n\n".to_string()),
            1 => Just("\n".to_string()),
        ],
        0..120,
    )
    .prop_map(|parts| parts.concat())
}

/// `(max_chunk_size, overlap)` with `overlap < max_chunk_size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let skip = if i == 0 { 0 } else { overlap };
        text.extend(chunk.text.chars().skip(skip));
    }
    text
}

mod prop_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn overlap_removed_concatenation_reconstructs_text(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let chunks = chunk_text(&text, size, overlap).unwrap();
            prop_assert_eq!(reconstruct(&chunks, overlap), text);
        }

        #[test]
        fn chunks_respect_size_and_share_exact_overlap(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let chunks = chunk_text(&text, size, overlap).unwrap();
            let chars: Vec<char> = text.chars().collect();

            for chunk in &chunks {
                prop_assert!(chunk.char_len() <= size);
                prop_assert!(!chunk.text.is_empty());
                let expected: String = chars[chunk.start_offset..chunk.end_offset].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].end_offset - pair[1].start_offset, overlap);
                prop_assert!(pair[1].start_offset > pair[0].start_offset);
            }
            if let Some(last) = chunks.last() {
                prop_assert_eq!(last.end_offset, chars.len());
            }
        }

        #[test]
        fn boundary_adjustment_stays_within_lookback(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let chunker = BoundaryChunker::new(size, overlap).unwrap();
            let chunks = chunker.split("doc", &text);
            if let Some((_, non_final)) = chunks.split_last() {
                for chunk in non_final {
                    prop_assert!(chunk.char_len() + chunker.lookback() >= size);
                }
            }
        }

        #[test]
        fn chunking_is_deterministic(
            text in arb_text(),
            (size, overlap) in arb_params(),
        ) {
            let first = chunk_text(&text, size, overlap).unwrap();
            let second = chunk_text(&text, size, overlap).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn text_within_size_is_a_single_chunk(
            text in "[a-z .\n]{1,40}",
            extra in 0usize..10,
        ) {
            let size = text.chars().count() + extra;
            let chunks = chunk_text(&text, size, 0).unwrap();
            prop_assert_eq!(chunks.len(), 1);
            prop_assert_eq!(&chunks[0].text, &text);
        }
    }
}

#[test]
fn empty_document_yields_no_chunks() {
    let chunker = BoundaryChunker::new(1000, 250).unwrap();
    assert!(chunker.chunk(&Document::new("empty.txt", "")).is_empty());
}

#[test]
fn default_parameters_split_long_prose_on_sentences() {
    let sentence = "Rust guarantees memory safety without a garbage collector. ";
    let text = sentence.repeat(60);
    let chunks = chunk_text(&text, 1000, 250).unwrap();

    assert!(chunks.len() > 1);
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.text.ends_with(". "), "chunk does not end on a sentence: {:?}", chunk.text);
    }
    assert_eq!(reconstruct(&chunks, 250), text);
}
