use proptest::prelude::*;

use docqa_core::chunker::{Chunker, ChunkingConfig};
use docqa_core::types::{Chunk, Domain};

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,12}",
            Just(" ".to_string()),
            Just(". ".to_string()),
            Just("\n".to_string()),
            Just("\n\n".to_string()),
            "[àéîõüß€]{1,3}",
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn chunks_rebuild_the_original_text(
        text in text_strategy(),
        size in 4usize..120,
        overlap_pct in 0usize..90,
    ) {
        let overlap = size * overlap_pct / 100;
        let chunker = Chunker::new(ChunkingConfig { chunk_size: size, overlap }).unwrap();
        let chunks = chunker.chunk("doc", Domain::General, 0, &text);

        let rebuilt: String = chunks.iter().map(Chunk::fresh_text).collect();
        prop_assert_eq!(&rebuilt, &text);

        for (i, c) in chunks.iter().enumerate() {
            prop_assert_eq!(c.index, i);
            prop_assert_eq!(&c.text, &text[c.start..c.end]);
            prop_assert!(c.overlap <= overlap);
        }
        for w in chunks.windows(2) {
            prop_assert!(w[1].start > w[0].start);
            prop_assert!(w[1].end > w[0].end);
            prop_assert_eq!(w[0].end - w[1].start, w[1].overlap);
        }
        if let Some(last) = chunks.last() {
            prop_assert_eq!(last.end, text.len());
        }
    }
}
