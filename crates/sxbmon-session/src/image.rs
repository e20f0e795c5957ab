//! WDC binary images.
//!
//! The WDC assembler and linker emit, with `-g`, a `Z`-signed image:
//!
//! ```text
//! 'Z' { address(3 LE) length(3 LE) data[length] }* [ entry(3 LE) 00 00 00 ]
//! ```
//! A record with zero length ends the image and names the entry point.

use bytes::Bytes;

use crate::error::ValidationError;
use crate::model::{validate_range, Address};

/// First byte of a WDC image.
pub const IMAGE_SIGNATURE: u8 = 0x5A;

const RECORD_HEADER_SIZE: usize = 6;

/// One contiguous run of bytes to place in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSection {
    pub address: Address,
    pub data: Bytes,
}

/// A loadable program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    pub sections: Vec<ImageSection>,
    pub entry: Option<Address>,
}

impl Image {
    /// Parse a WDC `Z` image.
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        match bytes.first() {
            Some(&IMAGE_SIGNATURE) => {}
            _ => {
                return Err(ValidationError::Image(
                    "missing 'Z' signature (assemble/link with -g)".to_string(),
                ))
            }
        }

        let mut image = Image::default();
        let mut pos = 1usize;

        while pos < bytes.len() {
            let header = bytes.get(pos..pos + RECORD_HEADER_SIZE).ok_or_else(|| {
                ValidationError::Image(format!("truncated record header at offset {pos}"))
            })?;
            let address = le24(&header[0..3]);
            let length = le24(&header[3..6]) as usize;
            pos += RECORD_HEADER_SIZE;

            if length == 0 {
                image.entry = Some(Address::try_from(address)?);
                break;
            }

            let data = bytes.get(pos..pos + length).ok_or_else(|| {
                ValidationError::Image(format!(
                    "record at offset {} declares {length} byte(s), {} available",
                    pos - RECORD_HEADER_SIZE,
                    bytes.len() - pos
                ))
            })?;
            let address = Address::try_from(address)?;
            validate_range(address, length)?;
            image.sections.push(ImageSection {
                address,
                data: Bytes::copy_from_slice(data),
            });
            pos += length;
        }

        if image.sections.is_empty() {
            return Err(ValidationError::Image("image contains no data".to_string()));
        }
        Ok(image)
    }

    /// A single raw section placed at `address`.
    pub fn raw(address: Address, data: impl Into<Bytes>) -> Result<Self, ValidationError> {
        let data = data.into();
        validate_range(address, data.len())?;
        Ok(Self {
            sections: vec![ImageSection { address, data }],
            entry: None,
        })
    }

    /// Total data bytes across all sections.
    pub fn total_len(&self) -> usize {
        self.sections.iter().map(|s| s.data.len()).sum()
    }
}

fn le24(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: u32, data: &[u8]) -> Vec<u8> {
        let mut out = address.to_le_bytes()[..3].to_vec();
        out.extend_from_slice(&(data.len() as u32).to_le_bytes()[..3]);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn parses_sections_and_entry() {
        let mut bytes = vec![IMAGE_SIGNATURE];
        bytes.extend(record(0x2000, &[0xA9, 0x01, 0x60]));
        bytes.extend(record(0x3000, &[0xEA]));
        bytes.extend(record(0x2000, &[]));

        let image = Image::parse(&bytes).unwrap();
        assert_eq!(image.sections.len(), 2);
        assert_eq!(image.sections[0].address, Address::new(0x2000));
        assert_eq!(image.sections[0].data.as_ref(), &[0xA9, 0x01, 0x60]);
        assert_eq!(image.sections[1].address, Address::new(0x3000));
        assert_eq!(image.entry, Some(Address::new(0x2000)));
        assert_eq!(image.total_len(), 4);
    }

    #[test]
    fn image_without_terminator_is_accepted() {
        let mut bytes = vec![IMAGE_SIGNATURE];
        bytes.extend(record(0x0400, &[1, 2]));
        let image = Image::parse(&bytes).unwrap();
        assert_eq!(image.entry, None);
        assert_eq!(image.total_len(), 2);
    }

    #[test]
    fn missing_signature_is_rejected() {
        let err = Image::parse(&[0x00, 0x00, 0x20]).unwrap_err();
        assert!(matches!(err, ValidationError::Image(msg) if msg.contains("-g")));
        assert!(Image::parse(&[]).is_err());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let mut bytes = vec![IMAGE_SIGNATURE];
        bytes.extend(record(0x2000, &[1, 2, 3, 4]));
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(Image::parse(&bytes), Err(ValidationError::Image(_))));

        let short_header = [IMAGE_SIGNATURE, 0x00, 0x20];
        assert!(matches!(
            Image::parse(&short_header),
            Err(ValidationError::Image(_))
        ));
    }

    #[test]
    fn section_past_top_of_memory_is_rejected() {
        let mut bytes = vec![IMAGE_SIGNATURE];
        bytes.extend(record(0xFFFF, &[1, 2]));
        assert!(matches!(
            Image::parse(&bytes),
            Err(ValidationError::RangeOverflow { .. })
        ));
    }

    #[test]
    fn raw_image_validates_range() {
        let image = Image::raw(Address::new(0x1000), vec![0xEA; 8]).unwrap();
        assert_eq!(image.sections.len(), 1);
        assert_eq!(Image::raw(Address::new(0), Vec::new()).unwrap_err(), ValidationError::ZeroLength);
    }
}
