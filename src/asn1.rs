//! Minimal BER/DER tag-length-value codec.
//!
//! Only low tag numbers (0..=30) and definite lengths of up to four length
//! octets are understood, which covers every structure the key layouts in
//! this crate use. Elements are plain values: a constructed element simply
//! holds the concatenated encodings of its children, which can be walked
//! again with [`DataElement::children`].

use alloc::vec::Vec;
use core::iter::FusedIterator;
use zeroize::Zeroize;

use crate::errors::{Error, Result};

/// Default cap on the content length of a single element.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 8 * 1024;

/// Bounds applied while decoding untrusted input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Largest content length a single element may claim.
    pub max_content_length: usize,
}

impl Limits {
    /// Limits with the given content length cap.
    pub const fn new(max_content_length: usize) -> Self {
        Self { max_content_length }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONTENT_LENGTH)
    }
}

/// Tag class, the two high bits of the identifier octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    /// Types defined by X.680 itself.
    Universal = 0,
    /// Application-wide types.
    Application = 1,
    /// Tags whose meaning depends on the enclosing structure.
    ContextSpecific = 2,
    /// Privately defined types.
    Private = 3,
}

impl Class {
    fn from_identifier(octet: u8) -> Self {
        match octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }
}

/// Low tag number (the five low bits of the identifier octet).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag(u8);

impl Tag {
    /// `END OF CONTENT`
    pub const END_OF_CONTENT: Tag = Tag(0x00);
    /// `INTEGER`
    pub const INTEGER: Tag = Tag(0x02);
    /// `BIT STRING`
    pub const BIT_STRING: Tag = Tag(0x03);
    /// `OCTET STRING`
    pub const OCTET_STRING: Tag = Tag(0x04);
    /// `NULL`
    pub const NULL: Tag = Tag(0x05);
    /// `OBJECT IDENTIFIER`
    pub const OBJECT_IDENTIFIER: Tag = Tag(0x06);
    /// `SEQUENCE` and `SEQUENCE OF`
    pub const SEQUENCE: Tag = Tag(0x10);
    /// `SET` and `SET OF`
    pub const SET: Tag = Tag(0x11);

    /// Tag number 31 selects the high tag number form, which is not supported.
    const HIGH_TAG_NUMBER: u8 = 0x1f;

    /// Creates a tag from its number.
    ///
    /// # Panics
    ///
    /// Panics if `number` does not fit the low tag number form (`>= 31`).
    pub const fn new(number: u8) -> Self {
        assert!(number < Self::HIGH_TAG_NUMBER, "tag number out of range");
        Tag(number)
    }

    /// The tag number.
    pub const fn number(self) -> u8 {
        self.0
    }
}

const CONSTRUCTED_BIT: u8 = 0x20;

/// One decoded tag-length-value element.
///
/// Content may be key material, so it is zeroized on drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataElement {
    /// Tag class.
    pub class: Class,
    /// Whether the content is a series of nested elements.
    pub constructed: bool,
    /// Tag number.
    pub tag: Tag,
    /// Content octets.
    pub content: Vec<u8>,
}

impl DataElement {
    /// Creates an element from its parts.
    pub fn new(class: Class, constructed: bool, tag: Tag, content: impl Into<Vec<u8>>) -> Self {
        Self {
            class,
            constructed,
            tag,
            content: content.into(),
        }
    }

    /// A universal, primitive element such as an `INTEGER` or `OCTET STRING`.
    pub fn primitive(tag: Tag, content: impl Into<Vec<u8>>) -> Self {
        Self::new(Class::Universal, false, tag, content)
    }

    /// A constructed element wrapping the encodings of `children`.
    pub fn constructed(class: Class, tag: Tag, children: &[DataElement]) -> Self {
        let mut content = Vec::with_capacity(children.iter().map(Self::encoded_len).sum());
        for child in children {
            write_element(&mut content, child);
        }
        Self::new(class, true, tag, content)
    }

    /// A universal `SEQUENCE` of `children`.
    pub fn sequence(children: &[DataElement]) -> Self {
        Self::constructed(Class::Universal, Tag::SEQUENCE, children)
    }

    /// Returns `true` if this element has the given class, form and tag.
    pub fn is(&self, class: Class, constructed: bool, tag: Tag) -> bool {
        self.class == class && self.constructed == constructed && self.tag == tag
    }

    /// Returns `true` for a universal, primitive element with this tag.
    pub fn is_universal_primitive(&self, tag: Tag) -> bool {
        self.is(Class::Universal, false, tag)
    }

    /// Iterates over the elements nested in this element's content.
    ///
    /// Children can never be longer than their parent, so the parent's
    /// content length serves as the cap.
    pub fn children(&self) -> Elements<'_> {
        Elements::with_limits(&self.content, Limits::new(self.content.len()))
    }

    /// Number of octets [`write_element`] produces for this element.
    pub fn encoded_len(&self) -> usize {
        1 + length_octets(self.content.len()) + self.content.len()
    }

    /// DER encoding of this element.
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        write_element(&mut out, self);
        out
    }
}

impl Zeroize for DataElement {
    fn zeroize(&mut self) {
        self.content.zeroize();
    }
}

impl Drop for DataElement {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Lazily decodes consecutive elements from `input` with default [`Limits`].
pub fn read_elements(input: &[u8]) -> Elements<'_> {
    Elements::new(input)
}

/// Iterator over consecutive top-level elements of a byte slice.
///
/// Iteration ends cleanly when the input is exhausted. The input may carry
/// trailing data that is not ASN.1 at all, so callers take as many elements
/// as they expect and can inspect the rest through [`Elements::remaining`].
/// After the first error the iterator is exhausted.
#[derive(Clone, Debug)]
pub struct Elements<'a> {
    input: &'a [u8],
    limits: Limits,
    failed: bool,
}

impl<'a> Elements<'a> {
    /// Decodes `input` with default [`Limits`].
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_limits(input, Limits::default())
    }

    /// Decodes `input` with custom [`Limits`].
    pub fn with_limits(input: &'a [u8], limits: Limits) -> Self {
        Self {
            input,
            limits,
            failed: false,
        }
    }

    /// Input not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.input
    }

    fn decode_one(&mut self) -> Result<DataElement> {
        let (&identifier, rest) = self
            .input
            .split_first()
            .ok_or_else(|| Error::malformed("unexpected end of input in identifier"))?;

        let number = identifier & 0x1f;
        if number == Tag::HIGH_TAG_NUMBER {
            return Err(Error::malformed("high tag number form is not supported"));
        }

        let (length, rest) = decode_length(rest)?;
        if length > self.limits.max_content_length {
            tracing::debug!(
                length,
                max = self.limits.max_content_length,
                "ASN.1 element exceeds content length cap"
            );
            return Err(Error::malformed(format!(
                "element length {} exceeds the cap of {} bytes",
                length, self.limits.max_content_length
            )));
        }
        if length > rest.len() {
            tracing::debug!(length, available = rest.len(), "ASN.1 element truncated");
            return Err(Error::malformed(format!(
                "element claims {} content bytes but only {} remain",
                length,
                rest.len()
            )));
        }

        let (content, rest) = rest.split_at(length);
        self.input = rest;

        Ok(DataElement {
            class: Class::from_identifier(identifier),
            constructed: identifier & CONSTRUCTED_BIT != 0,
            tag: Tag(number),
            content: content.to_vec(),
        })
    }
}

impl Iterator for Elements<'_> {
    type Item = Result<DataElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.input.is_empty() {
            return None;
        }

        let element = self.decode_one();
        self.failed = element.is_err();
        Some(element)
    }
}

impl FusedIterator for Elements<'_> {}

/// Appends the DER encoding of `element` to `out`.
pub fn write_element(out: &mut Vec<u8>, element: &DataElement) {
    let mut identifier = (element.class as u8) << 6 | element.tag.number();
    if element.constructed {
        identifier |= CONSTRUCTED_BIT;
    }
    out.push(identifier);
    encode_length(out, element.content.len());
    out.extend_from_slice(&element.content);
}

/// Appends a definite length: short form below 128, otherwise `0x80 | k`
/// followed by the `k` big-endian octets of the length.
fn encode_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }

    let octets = length_octets(length) - 1;
    debug_assert!(octets <= 4, "content too long for a four octet length");
    out.push(0x80 | octets as u8);
    let be = length.to_be_bytes();
    out.extend_from_slice(&be[be.len() - octets..]);
}

/// Total octets used to encode `length`, including the initial octet.
fn length_octets(length: usize) -> usize {
    if length < 0x80 {
        1
    } else {
        let significant = (usize::BITS - length.leading_zeros() + 7) / 8;
        1 + significant as usize
    }
}

fn decode_length(input: &[u8]) -> Result<(usize, &[u8])> {
    let (&first, rest) = input
        .split_first()
        .ok_or_else(|| Error::malformed("unexpected end of input in length"))?;

    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }

    let octets = (first & 0x7f) as usize;
    match octets {
        0 => return Err(Error::malformed("indefinite length is not supported")),
        1..=4 => {}
        _ => {
            return Err(Error::malformed(format!(
                "length uses {} octets, at most 4 are supported",
                octets
            )))
        }
    }
    if rest.len() < octets {
        return Err(Error::malformed("unexpected end of input in length"));
    }

    let (be, rest) = rest.split_at(octets);
    let length = be
        .iter()
        .fold(0usize, |acc, &octet| (acc << 8) | octet as usize);
    Ok((length, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn length_forms() {
        let cases: &[(usize, &[u8])] = &[
            (0, &hex!("00")),
            (1, &hex!("01")),
            (127, &hex!("7f")),
            (128, &hex!("8180")),
            (255, &hex!("81ff")),
            (256, &hex!("820100")),
            (8192, &hex!("822000")),
            (0x0100_0000, &hex!("8401000000")),
        ];

        for (length, expected) in cases {
            let mut out = Vec::new();
            encode_length(&mut out, *length);
            assert_eq!(&out[..], *expected, "length {}", length);
            assert_eq!(length_octets(*length), expected.len());

            let (decoded, rest) = decode_length(expected).unwrap();
            assert_eq!(decoded, *length);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn content_length_roundtrip() {
        let limits = Limits::new(8192);
        for &length in &[0usize, 1, 127, 128, 129, 254, 255, 256, 257, 8192] {
            let element = DataElement::primitive(Tag::OCTET_STRING, vec![0xa5; length]);
            let der = element.to_der();
            assert_eq!(der.len(), element.encoded_len());

            let mut elements = Elements::with_limits(&der, limits);
            let decoded = elements.next().unwrap().unwrap();
            assert_eq!(decoded.content.len(), length);
            assert_eq!(decoded, element);
            assert!(elements.next().is_none());
        }
    }

    #[test]
    fn identifier_octet() {
        let element = DataElement::new(Class::ContextSpecific, true, Tag::new(0), vec![]);
        assert_eq!(element.to_der(), hex!("a000"));

        let element = DataElement::sequence(&[DataElement::primitive(Tag::NULL, vec![])]);
        assert_eq!(element.to_der(), hex!("30020500"));

        let decoded = read_elements(&hex!("6103020100")).next().unwrap().unwrap();
        assert_eq!(decoded.class, Class::Application);
        assert!(decoded.constructed);
        assert_eq!(decoded.tag.number(), 1);

        let decoded = read_elements(&hex!("df00")).next().unwrap();
        assert!(decoded.is_err(), "tag 31 must be rejected");

        let decoded = read_elements(&hex!("c100")).next().unwrap().unwrap();
        assert_eq!(decoded.class, Class::Private);
    }

    #[test]
    fn stops_at_end_and_leaves_trailing_data() {
        let input = hex!("020101 020102 ffff");
        let mut elements = read_elements(&input);
        assert_eq!(elements.next().unwrap().unwrap().content, [0x01]);
        assert_eq!(elements.next().unwrap().unwrap().content, [0x02]);
        assert_eq!(elements.remaining(), hex!("ffff"));

        assert_eq!(read_elements(&[]).count(), 0);
    }

    #[test]
    fn children_of_constructed() {
        let sequence = DataElement::sequence(&[
            DataElement::primitive(Tag::INTEGER, vec![0x00]),
            DataElement::primitive(Tag::OCTET_STRING, vec![0xde, 0xad]),
        ]);
        let der = sequence.to_der();
        assert_eq!(der, hex!("3007 020100 0402dead"));

        let decoded = read_elements(&der).next().unwrap().unwrap();
        assert!(decoded.is(Class::Universal, true, Tag::SEQUENCE));
        let children: Vec<_> = decoded.children().collect::<Result<_>>().unwrap();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_universal_primitive(Tag::INTEGER));
        assert!(children[1].is_universal_primitive(Tag::OCTET_STRING));
    }

    #[test]
    fn rejects_malformed_input() {
        // truncated content
        assert!(read_elements(&hex!("0403aabb")).next().unwrap().is_err());
        // missing length
        assert!(read_elements(&hex!("04")).next().unwrap().is_err());
        // truncated long-form length
        assert!(read_elements(&hex!("0482 01")).next().unwrap().is_err());
        // indefinite length
        assert!(read_elements(&hex!("3080 0000")).next().unwrap().is_err());
        // five length octets
        assert!(read_elements(&hex!("0485 0000000001 00"))
            .next()
            .unwrap()
            .is_err());
    }

    #[test]
    fn zeroize_clears_content() {
        let mut element = DataElement::primitive(Tag::INTEGER, vec![0xde, 0xad, 0xbe, 0xef]);
        element.zeroize();
        assert!(element.content.is_empty());
        assert_eq!(element.tag, Tag::INTEGER);
    }

    #[test]
    fn enforces_length_cap() {
        let element = DataElement::primitive(Tag::OCTET_STRING, vec![0; 8193]);
        let der = element.to_der();

        let err = read_elements(&der).next().unwrap().unwrap_err();
        assert!(err.is_format());

        let decoded = Elements::with_limits(&der, Limits::new(16 * 1024))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(decoded.content.len(), 8193);

        let mut small = Elements::with_limits(&hex!("0403aabbcc 0400"), Limits::new(2));
        assert!(small.next().unwrap().is_err());
        assert!(small.next().is_none(), "iterator is fused after an error");
    }
}
