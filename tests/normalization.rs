//! End-to-end normalization scenarios over the public API.

use morsel::{
    compile_chars_map, decode_chars_map, encode_chars_map, Normalizer, NormalizerSpec,
    SPACE_SYMBOL,
};

fn default_normalizer() -> Normalizer {
    Normalizer::new(&NormalizerSpec::default())
}

#[test]
fn test_whitespace_policy_scenario() {
    let normalizer = default_normalizer();
    let out = normalizer.normalize(b" hello  world ");

    assert_eq!(out.text, format!("{SPACE_SYMBOL}hello{SPACE_SYMBOL}world"));
    assert_eq!(out.alignment.len(), out.text.len() + 1);
    // The alignment starts at the input position of `h`, not the removed
    // leading space.
    assert_eq!(out.alignment[0], 1);
}

#[test]
fn test_alignment_invariants_hold_across_inputs() {
    let normalizer = default_normalizer();
    let inputs: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b" ".to_vec(),
        b"a".to_vec(),
        b"   leading".to_vec(),
        b"trailing   ".to_vec(),
        "日本語 テスト".as_bytes().to_vec(),
        b"a\xc3\x28b".to_vec(),
        b"\x80\x80\x80".to_vec(),
    ];
    for input in &inputs {
        let out = normalizer.normalize(input);
        assert_eq!(
            out.alignment.len(),
            out.text.len() + 1,
            "length invariant for {input:?}"
        );
        for pair in out.alignment.windows(2) {
            assert!(pair[0] <= pair[1], "monotonicity for {input:?}");
        }
        assert!(*out.alignment.last().unwrap() <= input.len());
    }
}

#[test]
fn test_malformed_prefix_scenario() {
    let spec = NormalizerSpec {
        add_dummy_prefix: false,
        ..NormalizerSpec::default()
    };
    let out = Normalizer::new(&spec).normalize(&[0xc3, 0x28]);
    // One replacement character for the broken lead byte, then `(`
    // examined independently.
    assert_eq!(out.text.as_bytes()[..3], [0xef, 0xbf, 0xbd]);
    assert_eq!(&out.text[3..], "(");
}

#[test]
fn test_charsmap_driven_rewriting_with_alignment() {
    // A two-character source mapping to a single character, embedded in
    // identity text.
    let blob = compile_chars_map([("ae", "\u{00e6}"), ("OE", "\u{0152}")].into_iter()).unwrap();
    let spec = NormalizerSpec {
        precompiled_chars_map: blob,
        add_dummy_prefix: false,
        ..NormalizerSpec::default()
    };
    let normalizer = Normalizer::new(&spec);
    assert!(normalizer.status().is_ok());

    let out = normalizer.normalize(b"maestro");
    assert_eq!(out.text, "m\u{00e6}stro");
    // Both bytes of the replacement point at the start of "ae".
    assert_eq!(out.alignment[1], 1);
    assert_eq!(out.alignment[2], 1);
    // The byte after the replacement maps past the consumed pair.
    assert_eq!(out.alignment[3], 3);
}

#[test]
fn test_codec_round_trip_property() {
    let cases: Vec<(Vec<u8>, Vec<u8>)> = vec![
        (b"".to_vec(), b"\0".to_vec()),
        (b"T".to_vec(), b"abc\0def\0".to_vec()),
        (vec![0u8; 64], b"x\0".to_vec()),
    ];
    for (trie, normalized) in &cases {
        let blob = encode_chars_map(trie, normalized);
        let (decoded_trie, decoded_normalized) = decode_chars_map(&blob).unwrap();
        assert_eq!(decoded_trie, trie.as_slice());
        assert_eq!(decoded_normalized, normalized.as_slice());
    }
}

#[test]
fn test_identity_normalizer_keeps_interior_text() {
    let spec = NormalizerSpec {
        add_dummy_prefix: false,
        escape_whitespaces: false,
        remove_extra_whitespaces: false,
        ..NormalizerSpec::default()
    };
    let normalizer = Normalizer::new(&spec);
    let out = normalizer.normalize("unchanged text 123 \u{3042}".as_bytes());
    assert_eq!(out.text, "unchanged text 123 \u{3042}");
    let offsets: Vec<usize> = (0..=out.text.len()).collect();
    // Identity: every byte maps to itself.
    let mut expected = Vec::new();
    let mut pos = 0;
    for ch in out.text.chars() {
        for _ in 0..ch.len_utf8() {
            expected.push(pos);
        }
        pos += ch.len_utf8();
    }
    expected.push(pos);
    assert_eq!(out.alignment, expected);
    assert_eq!(offsets.len(), out.alignment.len());
}
