//! Word lists for turning derived bits into typable passwords.

use seeded_common::{Error, Result};

/// A word list that a Password recipe may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordListName {
    /// The 2048-word BIP-39 English list.
    #[default]
    Bip39English,
}

impl WordListName {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bip39English => "BIP39_EN_2048",
        }
    }

    /// # Errors
    /// - `InvalidRecipeValue` for an unrecognized or unsupported list
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "BIP39_EN_2048" => Ok(Self::Bip39English),
            other => Err(Error::InvalidRecipeValue(format!("Unsupported word list: {}", other))),
        }
    }

    pub fn words(self) -> &'static [&'static str] {
        match self {
            Self::Bip39English => bip39::Language::English.word_list(),
        }
    }

    /// Bits of entropy carried by each word.
    pub fn bits_per_word(self) -> usize {
        match self {
            Self::Bip39English => 11,
        }
    }

    /// Number of words needed to carry at least `bits` bits.
    pub fn words_for_bits(self, bits: usize) -> usize {
        bits.div_ceil(self.bits_per_word())
    }

    /// Number of secret bytes consumed by `word_count` words.
    pub fn bytes_for_words(self, word_count: usize) -> usize {
        (word_count * self.bits_per_word()).div_ceil(8)
    }

    /// Map `bytes` onto `word_count` words, reading bits most significant
    /// first.
    ///
    /// # Errors
    /// - `KeyLength` if `bytes` is shorter than
    ///   [`WordListName::bytes_for_words`] requires
    pub fn words_from_bytes(self, bytes: &[u8], word_count: usize) -> Result<Vec<&'static str>> {
        let needed = self.bytes_for_words(word_count);
        if bytes.len() < needed {
            return Err(Error::key_length(needed, bytes.len()));
        }

        let list = self.words();
        let bits_per_word = self.bits_per_word();
        let words = (0..word_count)
            .map(|word| {
                let index = (0..bits_per_word).fold(0usize, |index, offset| {
                    let bit = word * bits_per_word + offset;
                    let value = (bytes[bit / 8] >> (7 - bit % 8)) & 1;
                    (index << 1) | usize::from(value)
                });
                list[index]
            })
            .collect();
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bip39_list_shape() {
        let list = WordListName::Bip39English.words();
        assert_eq!(list.len(), 1 << WordListName::Bip39English.bits_per_word());
        assert_eq!(list[0], "abandon");
        assert_eq!(list[2047], "zoo");
    }

    #[test]
    fn test_name_round_trip() {
        let name = WordListName::Bip39English.name();
        assert_eq!(WordListName::from_name(name).unwrap(), WordListName::Bip39English);
    }

    #[test]
    fn test_unsupported_lists_rejected() {
        for name in [
            "EN_512_words_5_chars_max_ed_4_20200917",
            "EN_1024_words_6_chars_max_ed_4_20200917",
        ] {
            assert!(matches!(
                WordListName::from_name(name),
                Err(Error::InvalidRecipeValue(_))
            ));
        }
    }

    #[test]
    fn test_word_and_byte_counts() {
        let list = WordListName::Bip39English;
        assert_eq!(list.words_for_bits(128), 12);
        assert_eq!(list.words_for_bits(11), 1);
        assert_eq!(list.bytes_for_words(12), 17);
        assert_eq!(list.bytes_for_words(1), 2);
    }

    #[test]
    fn test_bits_read_msb_first() {
        let list = WordListName::Bip39English;
        // 0b00000000_001xxxxx -> index 1
        assert_eq!(list.words_from_bytes(&[0x00, 0x20], 1).unwrap(), vec!["ability"]);
        // all ones -> index 2047
        assert_eq!(list.words_from_bytes(&[0xff, 0xff, 0xff], 2).unwrap(), vec!["zoo", "zoo"]);
        // second word starts at bit 11: 0b00000000_000_00000_000001xx -> index 1
        assert_eq!(
            list.words_from_bytes(&[0x00, 0x00, 0x04], 2).unwrap(),
            vec!["abandon", "ability"]
        );
    }

    #[test]
    fn test_short_input_rejected() {
        let err = WordListName::Bip39English.words_from_bytes(&[0u8; 16], 12).unwrap_err();
        assert!(matches!(err, Error::KeyLength { expected: 17, actual: 16 }));
    }
}
