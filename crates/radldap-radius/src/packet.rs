//! RADIUS packet encoding and decoding (RFC 2865 section 3)

use crate::attributes::{Attribute, AttributeType};
use std::fmt;
use thiserror::Error;

/// Code, identifier, length and authenticator
pub const HEADER_LEN: usize = 20;

/// Largest packet RFC 2865 allows
pub const MAX_PACKET_LEN: usize = 4096;

pub const AUTHENTICATOR_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),

    #[error("invalid length field {declared} (received {received} bytes)")]
    InvalidLength { declared: usize, received: usize },

    #[error("unknown packet code {0}")]
    UnknownCode(u8),

    #[error("malformed attribute at offset {0}")]
    MalformedAttribute(usize),

    #[error("attribute value too long: {0} bytes")]
    AttributeTooLong(usize),

    #[error("encoded packet too large: {0} bytes")]
    TooLarge(usize),

    #[error("invalid User-Password length {0}")]
    InvalidPasswordLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Code {
    AccessRequest = 1,
    AccessAccept = 2,
    AccessReject = 3,
    AccountingRequest = 4,
    AccountingResponse = 5,
    AccessChallenge = 11,
    StatusServer = 12,
    StatusClient = 13,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::AccessRequest),
            2 => Some(Self::AccessAccept),
            3 => Some(Self::AccessReject),
            4 => Some(Self::AccountingRequest),
            5 => Some(Self::AccountingResponse),
            11 => Some(Self::AccessChallenge),
            12 => Some(Self::StatusServer),
            13 => Some(Self::StatusClient),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessRequest => "Access-Request",
            Self::AccessAccept => "Access-Accept",
            Self::AccessReject => "Access-Reject",
            Self::AccountingRequest => "Accounting-Request",
            Self::AccountingResponse => "Accounting-Response",
            Self::AccessChallenge => "Access-Challenge",
            Self::StatusServer => "Status-Server",
            Self::StatusClient => "Status-Client",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub code: Code,
    pub identifier: u8,
    pub authenticator: [u8; AUTHENTICATOR_LEN],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    pub fn new(code: Code, identifier: u8, authenticator: [u8; AUTHENTICATOR_LEN]) -> Self {
        Self {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    /// Decode a datagram. Octets past the length field are padding and ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::TooShort(buf.len()));
        }

        let declared = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&declared) || declared > buf.len() {
            return Err(PacketError::InvalidLength {
                declared,
                received: buf.len(),
            });
        }

        let code = Code::from_u8(buf[0]).ok_or(PacketError::UnknownCode(buf[0]))?;
        let mut authenticator = [0u8; AUTHENTICATOR_LEN];
        authenticator.copy_from_slice(&buf[4..HEADER_LEN]);

        let mut attributes = Vec::new();
        let mut offset = HEADER_LEN;
        while offset < declared {
            if declared - offset < 2 {
                return Err(PacketError::MalformedAttribute(offset));
            }
            let typ = buf[offset];
            let len = buf[offset + 1] as usize;
            if len < 2 || offset + len > declared {
                return Err(PacketError::MalformedAttribute(offset));
            }
            attributes.push(Attribute {
                typ,
                value: buf[offset + 2..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(Self {
            code,
            identifier: buf[1],
            authenticator,
            attributes,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let length = HEADER_LEN
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_len)
                .sum::<usize>();
        if length > MAX_PACKET_LEN {
            return Err(PacketError::TooLarge(length));
        }

        let mut buf = Vec::with_capacity(length);
        buf.push(self.code as u8);
        buf.push(self.identifier);
        buf.extend_from_slice(&(length as u16).to_be_bytes());
        buf.extend_from_slice(&self.authenticator);
        for attr in &self.attributes {
            if attr.value.len() > crate::attributes::MAX_ATTRIBUTE_VALUE_LEN {
                return Err(PacketError::AttributeTooLong(attr.value.len()));
            }
            buf.push(attr.typ);
            buf.push(attr.encoded_len() as u8);
            buf.extend_from_slice(&attr.value);
        }
        Ok(buf)
    }

    pub fn add_attribute(&mut self, attr: Attribute) {
        self.attributes.push(attr);
    }

    /// First attribute of the given type
    pub fn get(&self, typ: AttributeType) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.typ == typ as u8)
    }

    pub fn get_mut(&mut self, typ: AttributeType) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.typ == typ as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_vectors::RFC_ACCESS_REQUEST;

    #[test]
    fn test_decode_rfc_access_request() {
        let raw = hex::decode(RFC_ACCESS_REQUEST).unwrap();
        let packet = Packet::decode(&raw).unwrap();

        assert_eq!(packet.code, Code::AccessRequest);
        assert_eq!(packet.identifier, 0);
        assert_eq!(packet.attributes.len(), 4);
        assert_eq!(
            packet.get(AttributeType::UserName).and_then(|a| a.as_str()),
            Some("nemo")
        );
        assert_eq!(
            packet.get(AttributeType::UserPassword).map(|a| a.value.len()),
            Some(16)
        );
        assert_eq!(packet.encode().unwrap(), raw);
    }

    #[test]
    fn test_decode_ignores_trailing_padding() {
        let mut raw = hex::decode(RFC_ACCESS_REQUEST).unwrap();
        let expected = raw.clone();
        raw.extend_from_slice(&[0u8; 12]);
        let packet = Packet::decode(&raw).unwrap();
        assert_eq!(packet.encode().unwrap(), expected);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(Packet::decode(&[1, 0, 0]), Err(PacketError::TooShort(3)));

        let raw = hex::decode(RFC_ACCESS_REQUEST).unwrap();

        // length field longer than the datagram
        assert!(matches!(
            Packet::decode(&raw[..40]),
            Err(PacketError::InvalidLength { declared: 56, .. })
        ));

        let mut bad_code = raw.clone();
        bad_code[0] = 99;
        assert_eq!(Packet::decode(&bad_code), Err(PacketError::UnknownCode(99)));

        // User-Name claims to run past the end of the packet
        let mut bad_attr = raw.clone();
        bad_attr[21] = 0xff;
        assert_eq!(
            Packet::decode(&bad_attr),
            Err(PacketError::MalformedAttribute(20))
        );

        // zero-length attribute would loop forever if accepted
        let mut zero_attr = raw;
        zero_attr[21] = 0;
        assert_eq!(
            Packet::decode(&zero_attr),
            Err(PacketError::MalformedAttribute(20))
        );
    }

    #[test]
    fn test_encode_rejects_oversized_packet() {
        let mut packet = Packet::new(Code::AccessAccept, 7, [0u8; 16]);
        for _ in 0..17 {
            packet.add_attribute(Attribute::new(18, vec![b'x'; 253]).unwrap());
        }
        assert!(matches!(packet.encode(), Err(PacketError::TooLarge(_))));
    }

    #[test]
    fn test_code_display() {
        assert_eq!(Code::AccessAccept.to_string(), "Access-Accept");
        assert_eq!(Code::from_u8(3), Some(Code::AccessReject));
        assert_eq!(Code::from_u8(0), None);
    }
}
