//! Property-based tests for the primitive encodings.

use std::io::Cursor;

use proptest::prelude::*;

use sevenstream::format::reader::{
    read_bool_vector, read_number, read_number_usize, write_number,
};

proptest! {
    #[test]
    fn number_roundtrip(value: u64) {
        let mut encoded = Vec::new();
        write_number(&mut encoded, value).unwrap();
        prop_assert!(encoded.len() <= 9);

        let decoded = read_number(&mut Cursor::new(&encoded)).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn number_narrowing_matches_limit(value: u64) {
        let mut encoded = Vec::new();
        write_number(&mut encoded, value).unwrap();

        let result = read_number_usize(&mut Cursor::new(&encoded));
        if value > 0x7FFF_FFFF {
            prop_assert!(result.is_err());
        } else {
            prop_assert_eq!(result.unwrap(), value as usize);
        }
    }

    #[test]
    fn bool_vector_roundtrip(bits in proptest::collection::vec(any::<bool>(), 0..64)) {
        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                bytes[i / 8] |= 0x80 >> (i % 8);
            }
        }

        let (decoded, set) = read_bool_vector(&mut Cursor::new(&bytes), bits.len()).unwrap();
        prop_assert_eq!(&decoded, &bits);
        prop_assert_eq!(set, bits.iter().filter(|&&b| b).count());
    }

    #[test]
    fn number_encoding_is_minimal(value: u64) {
        // Re-encoding a decoded value must reproduce the same bytes.
        let mut first = Vec::new();
        write_number(&mut first, value).unwrap();
        let decoded = read_number(&mut Cursor::new(&first)).unwrap();
        let mut second = Vec::new();
        write_number(&mut second, decoded).unwrap();
        prop_assert_eq!(first, second);
    }
}
