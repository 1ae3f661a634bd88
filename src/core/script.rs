//! Coarse Unicode script classification.
//!
//! `script_of` maps a scalar to its script class through a static range
//! table generated from the Unicode Script property, collapsed to the
//! principal assigned ranges. Anything outside the table is `Common`;
//! punctuation and symbols shared across scripts resolve the same way.

use std::cmp::Ordering;

/// Coarse script classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Common,
    Inherited,
    Arabic,
    Armenian,
    Balinese,
    Bengali,
    Bopomofo,
    Braille,
    CanadianAboriginal,
    Cherokee,
    Coptic,
    Cyrillic,
    Deseret,
    Devanagari,
    Ethiopic,
    Georgian,
    Glagolitic,
    Gothic,
    Greek,
    Gujarati,
    Gurmukhi,
    Han,
    Hangul,
    Hebrew,
    Hiragana,
    Kannada,
    Katakana,
    Khmer,
    Lao,
    Latin,
    Limbu,
    Malayalam,
    Mongolian,
    Myanmar,
    Ogham,
    OldItalic,
    Oriya,
    Runic,
    Sinhala,
    Sundanese,
    Syriac,
    TaiLe,
    Tamil,
    Telugu,
    Thaana,
    Thai,
    Tibetan,
    Tifinagh,
    Vai,
    Yi,
}

/// Sorted, non-overlapping `(first, last, script)` ranges.
#[rustfmt::skip]
static SCRIPT_RANGES: &[(u32, u32, Script)] = &[
    (0x0041, 0x005A, Script::Latin),
    (0x0061, 0x007A, Script::Latin),
    (0x00AA, 0x00AA, Script::Latin),
    (0x00BA, 0x00BA, Script::Latin),
    (0x00C0, 0x00D6, Script::Latin),
    (0x00D8, 0x00F6, Script::Latin),
    (0x00F8, 0x02B8, Script::Latin),
    (0x02E0, 0x02E4, Script::Latin),
    (0x0300, 0x036F, Script::Inherited),
    (0x0370, 0x0373, Script::Greek),
    (0x0375, 0x0377, Script::Greek),
    (0x037A, 0x037D, Script::Greek),
    (0x037F, 0x037F, Script::Greek),
    (0x0384, 0x0384, Script::Greek),
    (0x0386, 0x0386, Script::Greek),
    (0x0388, 0x03E1, Script::Greek),
    (0x03E2, 0x03EF, Script::Coptic),
    (0x03F0, 0x03FF, Script::Greek),
    (0x0400, 0x0484, Script::Cyrillic),
    (0x0485, 0x0486, Script::Inherited),
    (0x0487, 0x052F, Script::Cyrillic),
    (0x0531, 0x0556, Script::Armenian),
    (0x0559, 0x0588, Script::Armenian),
    (0x058A, 0x058A, Script::Armenian),
    (0x0591, 0x05C7, Script::Hebrew),
    (0x05D0, 0x05EA, Script::Hebrew),
    (0x05EF, 0x05F4, Script::Hebrew),
    (0x0600, 0x06FF, Script::Arabic),
    (0x0700, 0x074F, Script::Syriac),
    (0x0750, 0x077F, Script::Arabic),
    (0x0780, 0x07B1, Script::Thaana),
    (0x08A0, 0x08FF, Script::Arabic),
    (0x0900, 0x097F, Script::Devanagari),
    (0x0980, 0x09FF, Script::Bengali),
    (0x0A00, 0x0A7F, Script::Gurmukhi),
    (0x0A80, 0x0AFF, Script::Gujarati),
    (0x0B00, 0x0B7F, Script::Oriya),
    (0x0B80, 0x0BFF, Script::Tamil),
    (0x0C00, 0x0C7F, Script::Telugu),
    (0x0C80, 0x0CFF, Script::Kannada),
    (0x0D00, 0x0D7F, Script::Malayalam),
    (0x0D80, 0x0DFF, Script::Sinhala),
    (0x0E01, 0x0E3A, Script::Thai),
    (0x0E40, 0x0E5B, Script::Thai),
    (0x0E80, 0x0EFF, Script::Lao),
    (0x0F00, 0x0FFF, Script::Tibetan),
    (0x1000, 0x109F, Script::Myanmar),
    (0x10A0, 0x10FA, Script::Georgian),
    (0x10FC, 0x10FF, Script::Georgian),
    (0x1100, 0x11FF, Script::Hangul),
    (0x1200, 0x139F, Script::Ethiopic),
    (0x13A0, 0x13FF, Script::Cherokee),
    (0x1400, 0x167F, Script::CanadianAboriginal),
    (0x1680, 0x169F, Script::Ogham),
    (0x16A0, 0x16EA, Script::Runic),
    (0x16EE, 0x16F8, Script::Runic),
    (0x1780, 0x17FF, Script::Khmer),
    (0x1800, 0x18AF, Script::Mongolian),
    (0x1900, 0x194F, Script::Limbu),
    (0x1950, 0x197F, Script::TaiLe),
    (0x19E0, 0x19FF, Script::Khmer),
    (0x1AB0, 0x1AFF, Script::Inherited),
    (0x1B00, 0x1B7F, Script::Balinese),
    (0x1B80, 0x1BBF, Script::Sundanese),
    (0x1C80, 0x1C88, Script::Cyrillic),
    (0x1C90, 0x1CBF, Script::Georgian),
    (0x1DC0, 0x1DFF, Script::Inherited),
    (0x1E00, 0x1EFF, Script::Latin),
    (0x1F00, 0x1FFF, Script::Greek),
    (0x20D0, 0x20F0, Script::Inherited),
    (0x2126, 0x2126, Script::Greek),
    (0x212A, 0x212B, Script::Latin),
    (0x2800, 0x28FF, Script::Braille),
    (0x2C00, 0x2C5F, Script::Glagolitic),
    (0x2C60, 0x2C7F, Script::Latin),
    (0x2C80, 0x2CFF, Script::Coptic),
    (0x2D00, 0x2D2F, Script::Georgian),
    (0x2D30, 0x2D7F, Script::Tifinagh),
    (0x2DE0, 0x2DFF, Script::Cyrillic),
    (0x2E80, 0x2FDF, Script::Han),
    (0x3005, 0x3005, Script::Han),
    (0x3007, 0x3007, Script::Han),
    (0x3021, 0x3029, Script::Han),
    (0x302A, 0x302D, Script::Inherited),
    (0x302E, 0x302F, Script::Hangul),
    (0x3038, 0x303B, Script::Han),
    (0x3041, 0x3096, Script::Hiragana),
    (0x3099, 0x309A, Script::Inherited),
    (0x309D, 0x309F, Script::Hiragana),
    (0x30A1, 0x30FA, Script::Katakana),
    (0x30FD, 0x30FF, Script::Katakana),
    (0x3105, 0x312F, Script::Bopomofo),
    (0x3131, 0x318E, Script::Hangul),
    (0x31A0, 0x31BF, Script::Bopomofo),
    (0x31F0, 0x31FF, Script::Katakana),
    (0x3400, 0x4DBF, Script::Han),
    (0x4E00, 0x9FFF, Script::Han),
    (0xA000, 0xA4CF, Script::Yi),
    (0xA500, 0xA62B, Script::Vai),
    (0xA640, 0xA69F, Script::Cyrillic),
    (0xA722, 0xA7FF, Script::Latin),
    (0xA960, 0xA97C, Script::Hangul),
    (0xAB30, 0xAB5A, Script::Latin),
    (0xAC00, 0xD7A3, Script::Hangul),
    (0xD7B0, 0xD7FB, Script::Hangul),
    (0xF900, 0xFAD9, Script::Han),
    (0xFB00, 0xFB06, Script::Latin),
    (0xFB13, 0xFB17, Script::Armenian),
    (0xFB1D, 0xFB4F, Script::Hebrew),
    (0xFB50, 0xFDFF, Script::Arabic),
    (0xFE00, 0xFE0F, Script::Inherited),
    (0xFE20, 0xFE2D, Script::Inherited),
    (0xFE70, 0xFEFC, Script::Arabic),
    (0xFF21, 0xFF3A, Script::Latin),
    (0xFF41, 0xFF5A, Script::Latin),
    (0xFF66, 0xFF9D, Script::Katakana),
    (0xFFA0, 0xFFDC, Script::Hangul),
    (0x10300, 0x1032F, Script::OldItalic),
    (0x10330, 0x1034A, Script::Gothic),
    (0x10400, 0x1044F, Script::Deseret),
    (0x20000, 0x2A6DF, Script::Han),
    (0x2A700, 0x2EBEF, Script::Han),
    (0x2F800, 0x2FA1D, Script::Han),
];

/// Script class of `ch`; code points outside the table map to
/// [`Script::Common`].
pub fn script_of(ch: char) -> Script {
    let cp = ch as u32;
    match SCRIPT_RANGES.binary_search_by(|&(first, last, _)| {
        if cp < first {
            Ordering::Greater
        } else if cp > last {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }) {
        Ok(index) => SCRIPT_RANGES[index].2,
        Err(_) => Script::Common,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_disjoint() {
        for pair in SCRIPT_RANGES.windows(2) {
            assert!(pair[0].0 <= pair[0].1);
            assert!(pair[0].1 < pair[1].0, "overlap near {:#x}", pair[1].0);
        }
    }

    #[test]
    fn test_major_scripts() {
        assert_eq!(script_of('A'), Script::Latin);
        assert_eq!(script_of('ž'), Script::Latin);
        assert_eq!(script_of('π'), Script::Greek);
        assert_eq!(script_of('Ж'), Script::Cyrillic);
        assert_eq!(script_of('א'), Script::Hebrew);
        assert_eq!(script_of('ب'), Script::Arabic);
        assert_eq!(script_of('ก'), Script::Thai);
        assert_eq!(script_of('あ'), Script::Hiragana);
        assert_eq!(script_of('ア'), Script::Katakana);
        assert_eq!(script_of('中'), Script::Han);
        assert_eq!(script_of('한'), Script::Hangul);
        assert_eq!(script_of('ꔀ'), Script::Vai);
    }

    #[test]
    fn test_shared_code_points_are_common() {
        assert_eq!(script_of(' '), Script::Common);
        assert_eq!(script_of('7'), Script::Common);
        assert_eq!(script_of(','), Script::Common);
        assert_eq!(script_of('€'), Script::Common);
        // Katakana-Hiragana prolonged sound mark is shared.
        assert_eq!(script_of('ー'), Script::Common);
        // The whitespace sentinel itself.
        assert_eq!(script_of('\u{2581}'), Script::Common);
        assert_eq!(script_of('😀'), Script::Common);
    }

    #[test]
    fn test_combining_marks_are_inherited() {
        assert_eq!(script_of('\u{0301}'), Script::Inherited);
        assert_eq!(script_of('\u{3099}'), Script::Inherited);
        assert_eq!(script_of('\u{FE0F}'), Script::Inherited);
    }

    #[test]
    fn test_supplementary_plane_han() {
        assert_eq!(script_of('\u{20021}'), Script::Han);
    }
}
