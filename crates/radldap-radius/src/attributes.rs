//! RADIUS attributes

use crate::packet::PacketError;

/// Largest value an attribute can carry (255 minus the type/length octets)
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 253;

/// Attribute types used by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    UserName = 1,
    UserPassword = 2,
    NasIpAddress = 4,
    NasPort = 5,
    ReplyMessage = 18,
    State = 24,
    NasIdentifier = 32,
    MessageAuthenticator = 80,
}

/// A single type-length-value attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub typ: u8,
    pub value: Vec<u8>,
}

impl Attribute {
    pub fn new(typ: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > MAX_ATTRIBUTE_VALUE_LEN {
            return Err(PacketError::AttributeTooLong(value.len()));
        }
        Ok(Self { typ, value })
    }

    pub fn string(typ: u8, value: &str) -> Result<Self, PacketError> {
        Self::new(typ, value.as_bytes().to_vec())
    }

    /// Encoded size including the type and length octets
    pub fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }

    /// Value as UTF-8 text, if it is valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_limits() {
        assert!(Attribute::new(AttributeType::ReplyMessage as u8, vec![0; 253]).is_ok());
        assert_eq!(
            Attribute::new(AttributeType::ReplyMessage as u8, vec![0; 254]),
            Err(PacketError::AttributeTooLong(254))
        );
    }

    #[test]
    fn test_string_attribute() {
        let attr = Attribute::string(AttributeType::UserName as u8, "alice").unwrap();
        assert_eq!(attr.as_str(), Some("alice"));
        assert_eq!(attr.encoded_len(), 7);

        let raw = Attribute::new(AttributeType::UserName as u8, vec![0xff, 0xfe]).unwrap();
        assert_eq!(raw.as_str(), None);
    }
}
