//! `nom` primitives for TLV framing.

use nom::bytes::streaming::take;
use nom::number::streaming::{be_u16, be_u32, be_u64};
use nom::IResult;

/// Parses a variable-length number: one byte below 253, otherwise a
/// 0xFD/0xFE/0xFF prefix followed by 2/4/8 big-endian bytes.
pub(crate) fn var_number(input: &[u8]) -> IResult<&[u8], u64> {
    let (input, first) = take(1usize)(input)?;
    match first[0] {
        0xFD => {
            let (input, value) = be_u16(input)?;
            Ok((input, u64::from(value)))
        }
        0xFE => {
            let (input, value) = be_u32(input)?;
            Ok((input, u64::from(value)))
        }
        0xFF => be_u64(input),
        byte => Ok((input, u64::from(byte))),
    }
}

/// Parses a TLV header: the type then the value length.
pub(crate) fn type_and_length(input: &[u8]) -> IResult<&[u8], (u64, u64)> {
    let (input, ty) = var_number(input)?;
    let (input, length) = var_number(input)?;
    Ok((input, (ty, length)))
}

/// Parses one whole TLV, yielding its type and value slice.
pub(crate) fn tlv(input: &[u8]) -> IResult<&[u8], (u64, &[u8])> {
    let (input, (ty, length)) = type_and_length(input)?;
    let (input, value) = take(length)(input)?;
    Ok((input, (ty, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn one_byte_var_number() {
        assert_eq!((&[][..], 7), var_number(&[7]).unwrap());
        assert_eq!((&[][..], 252), var_number(&[252]).unwrap());
    }

    #[test]
    fn multi_byte_var_numbers() {
        assert_eq!((&[][..], 253), var_number(&[0xFD, 0x00, 0xFD]).unwrap());
        assert_eq!((&[][..], 0x1_0000), var_number(&[0xFE, 0, 1, 0, 0]).unwrap());
        assert_eq!(
            (&[][..], 0x1_0000_0000),
            var_number(&[0xFF, 0, 0, 0, 1, 0, 0, 0, 0]).unwrap()
        );
    }

    #[test]
    fn incomplete_var_number() {
        assert!(var_number(&[0xFD, 0x00]).is_err());
        assert!(var_number(&[]).is_err());
    }

    #[test]
    fn whole_tlv() {
        let (rest, (ty, value)) = tlv(&[8, 2, b'h', b'i', 0xAA]).unwrap();
        assert_eq!(8, ty);
        assert_eq!(b"hi", value);
        assert_eq!(&[0xAA], rest);
    }
}
