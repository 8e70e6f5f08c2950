//! Conversion between hexadecimal strings and big endian byte buffers.

extern crate alloc;

use alloc::string::String;

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum BytesFromHexStrError {
    #[error("hex string too long for the destination")]
    InvalidHexStrLen,
    #[error("invalid hex digit")]
    InvalidHexChar,
}

const fn nibble_from_hexchar(hex_char: u8) -> Result<u8, BytesFromHexStrError> {
    let base = match hex_char {
        b'0'..=b'9' => b'0',
        b'a'..=b'f' => b'a' - 0xa,
        b'A'..=b'F' => b'A' - 0xa,
        _ => return Err(BytesFromHexStrError::InvalidHexChar),
    };
    Ok(hex_char - base)
}

/// Parse a hex string into a fixed size, big endian byte array, zero-padded at the front.
///
/// Usable in const contexts, e.g. for modulus tables.
pub const fn be_bytes_from_hexstr<const N: usize>(
    hexstr: &str,
) -> Result<[u8; N], BytesFromHexStrError> {
    let hexstr = hexstr.as_bytes();
    if hexstr.len() > 2 * N {
        return Err(BytesFromHexStrError::InvalidHexStrLen);
    }

    let mut result: [u8; N] = [0; N];
    // Walk from the least significant nibble, an odd leading one ends up alone.
    let mut i = hexstr.len();
    let mut j = 0;
    while i > 0 {
        i -= 1;
        let nibble = match nibble_from_hexchar(hexstr[i]) {
            Ok(nibble) => nibble,
            Err(e) => return Err(e),
        };
        result[N - 1 - j / 2] |= nibble << (4 * (j % 2));
        j += 1;
    }
    Ok(result)
}

/// Runtime variant of [`be_bytes_from_hexstr()`] for a caller provided destination.
///
/// The destination gets cleared first.
pub fn be_bytes_from_hexstr_to(hexstr: &str, dst: &mut [u8]) -> Result<(), BytesFromHexStrError> {
    let hexstr = hexstr.as_bytes();
    if hexstr.len() > 2 * dst.len() {
        return Err(BytesFromHexStrError::InvalidHexStrLen);
    }

    dst.fill(0);
    let len = dst.len();
    for (j, c) in hexstr.iter().rev().enumerate() {
        dst[len - 1 - j / 2] |= nibble_from_hexchar(*c)? << (4 * (j % 2));
    }
    Ok(())
}

pub const fn be_bytes_from_hexstr_cnst<const N: usize>(hexstr: &str) -> [u8; N] {
    // Result::unwrap() is not a const fn :/, so provide a wrapper for
    // use in const contexts.
    match be_bytes_from_hexstr::<N>(hexstr) {
        Ok(result) => result,
        Err(_) => panic!("invalid hex string"),
    }
}

pub fn bytes_to_hexstr(bytes: &[u8]) -> Result<String, alloc::collections::TryReserveError> {
    let mut result = String::new();
    result.try_reserve_exact(2 * bytes.len())?;
    for b in bytes {
        result.push(nibble_to_hexchar(b >> 4));
        result.push(nibble_to_hexchar(b & 0xf))
    }
    Ok(result)
}

pub(crate) fn nibble_to_hexchar(nibble: u8) -> char {
    debug_assert!(nibble <= 0xf);
    let c = match nibble {
        0x0..=0x9 => b'0' + nibble,
        _ => b'a' + (nibble - 0xa),
    };
    c as char
}

#[test]
fn test_be_bytes_from_hexstr() {
    assert_eq!(
        be_bytes_from_hexstr::<11>("0123456789abcdefABCDEF").unwrap(),
        [0x01u8, 0x23u8, 0x45u8, 0x67u8, 0x89u8, 0xabu8, 0xcdu8, 0xefu8, 0xabu8, 0xcdu8, 0xefu8],
    );
    assert_eq!(
        be_bytes_from_hexstr::<11>("123456789abcdefABCDEF").unwrap(),
        [0x01u8, 0x23u8, 0x45u8, 0x67u8, 0x89u8, 0xabu8, 0xcdu8, 0xefu8, 0xabu8, 0xcdu8, 0xefu8],
    );
    assert_eq!(
        be_bytes_from_hexstr::<13>("123456789abcdefABCDEF").unwrap(),
        [
            0x00u8, 0x00u8, 0x01u8, 0x23u8, 0x45u8, 0x67u8, 0x89u8, 0xabu8, 0xcdu8, 0xefu8, 0xabu8,
            0xcdu8, 0xefu8
        ],
    );
    assert_eq!(
        be_bytes_from_hexstr::<2>("12345"),
        Err(BytesFromHexStrError::InvalidHexStrLen)
    );
    assert_eq!(
        be_bytes_from_hexstr::<2>("12g4"),
        Err(BytesFromHexStrError::InvalidHexChar)
    );
    assert_eq!(be_bytes_from_hexstr::<2>("").unwrap(), [0u8, 0u8]);
}

#[test]
fn test_be_bytes_from_hexstr_to() {
    let mut dst = [0xffu8; 4];
    be_bytes_from_hexstr_to("aBc", &mut dst).unwrap();
    assert_eq!(dst, [0x00, 0x00, 0x0a, 0xbc]);
    assert_eq!(
        be_bytes_from_hexstr_to("123456789", &mut dst),
        Err(BytesFromHexStrError::InvalidHexStrLen)
    );
    assert_eq!(
        be_bytes_from_hexstr_to("x1", &mut dst),
        Err(BytesFromHexStrError::InvalidHexChar)
    );
}

#[test]
fn test_bytes_to_hexstr() {
    assert_eq!(
        bytes_to_hexstr(&[0x01u8, 0x23u8, 0x45u8, 0x67u8, 0x89u8, 0xabu8, 0xcdu8, 0xefu8,])
            .unwrap(),
        "0123456789abcdef",
    );
}
