use ontorag_dto::{chunk_id, document_id, text_hash};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn document_ids_are_pure_40_hex(path in ".*") {
        let id = document_id(&path);
        prop_assert_eq!(id.clone(), document_id(&path));
        prop_assert_eq!(id.len(), 40);
        prop_assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn chunk_ids_are_pure_functions_of_all_inputs(
        (path, index, text) in (".*", 0usize..10_000, ".*")
    ) {
        let doc = document_id(&path);
        let id = chunk_id(&doc, index, &text);
        prop_assert_eq!(id.clone(), chunk_id(&doc, index, &text));
        prop_assert_eq!(id.len(), 40);
        // A different index always yields a different id.
        prop_assert_ne!(id, chunk_id(&doc, index + 1, &text));
    }

    #[test]
    fn text_hash_tracks_content(text in ".*") {
        prop_assert_eq!(text_hash(&text), text_hash(&text));
        let changed = format!("{text}!");
        prop_assert_ne!(text_hash(&text), text_hash(&changed));
    }
}
