//! Shared-secret cryptography: User-Password hiding, Response Authenticator
//! and Message-Authenticator

use crate::attributes::{Attribute, AttributeType};
use crate::packet::{Packet, PacketError, AUTHENTICATOR_LEN};
use digest::Digest;
use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// User-Password is hidden in 16-octet blocks, at most 128 octets in total
const PASSWORD_BLOCK: usize = 16;
const MAX_PASSWORD_LEN: usize = 128;

fn md5_concat(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Hide a password per RFC 2865 section 5.2
pub fn encrypt_user_password(
    password: &[u8],
    secret: &[u8],
    request_authenticator: &[u8; AUTHENTICATOR_LEN],
) -> Result<Vec<u8>, PacketError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(PacketError::InvalidPasswordLength(password.len()));
    }

    let padded_len = password.len().div_ceil(PASSWORD_BLOCK).max(1) * PASSWORD_BLOCK;
    let mut out = password.to_vec();
    out.resize(padded_len, 0);

    let mut prev: [u8; 16] = *request_authenticator;
    for chunk in out.chunks_mut(PASSWORD_BLOCK) {
        let b = md5_concat(&[secret, &prev]);
        for (c, k) in chunk.iter_mut().zip(b.iter()) {
            *c ^= k;
        }
        prev.copy_from_slice(chunk);
    }
    Ok(out)
}

/// Recover a hidden password; trailing NUL padding is stripped
pub fn decrypt_user_password(
    hidden: &[u8],
    secret: &[u8],
    request_authenticator: &[u8; AUTHENTICATOR_LEN],
) -> Result<Vec<u8>, PacketError> {
    if hidden.is_empty() || hidden.len() % PASSWORD_BLOCK != 0 || hidden.len() > MAX_PASSWORD_LEN
    {
        return Err(PacketError::InvalidPasswordLength(hidden.len()));
    }

    let mut out = Vec::with_capacity(hidden.len());
    let mut prev: &[u8] = request_authenticator;
    for chunk in hidden.chunks(PASSWORD_BLOCK) {
        let b = md5_concat(&[secret, prev]);
        out.extend(chunk.iter().zip(b.iter()).map(|(c, k)| c ^ k));
        prev = chunk;
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    Ok(out)
}

/// MD5(Code + Identifier + Length + RequestAuth + Attributes + Secret)
///
/// `encoded` is the response packet with the request authenticator in the
/// authenticator field.
pub fn calculate_response_authenticator(encoded: &[u8], secret: &[u8]) -> [u8; 16] {
    md5_concat(&[encoded, secret])
}

/// HMAC-MD5 over the encoded packet, Message-Authenticator value zeroed
pub fn calculate_message_authenticator(encoded: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(encoded);
    let mut out = [0u8; 16];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Verify the Message-Authenticator of a received request.
///
/// Returns `None` when the packet carries no Message-Authenticator.
pub fn verify_message_authenticator(packet: &Packet, secret: &[u8]) -> Option<bool> {
    let received = packet.get(AttributeType::MessageAuthenticator)?.value.clone();
    if received.len() != 16 {
        return Some(false);
    }

    let mut zeroed = packet.clone();
    if let Some(attr) = zeroed.get_mut(AttributeType::MessageAuthenticator) {
        attr.value = vec![0; 16];
    }
    let Ok(encoded) = zeroed.encode() else {
        return Some(false);
    };

    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(&encoded);
    Some(mac.verify_slice(&received).is_ok())
}

/// Sign a response in place: Message-Authenticator first (when requested),
/// then the Response Authenticator. `packet.authenticator` must hold the
/// request authenticator on entry.
pub fn sign_response(
    packet: &mut Packet,
    secret: &[u8],
    with_message_authenticator: bool,
) -> Result<Vec<u8>, PacketError> {
    if with_message_authenticator {
        packet.attributes.retain(|a| a.typ != AttributeType::MessageAuthenticator as u8);
        packet.add_attribute(Attribute::new(
            AttributeType::MessageAuthenticator as u8,
            vec![0; 16],
        )?);
        let digest = calculate_message_authenticator(&packet.encode()?, secret);
        if let Some(attr) = packet.get_mut(AttributeType::MessageAuthenticator) {
            attr.value = digest.to_vec();
        }
    }

    packet.authenticator = calculate_response_authenticator(&packet.encode()?, secret);
    packet.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Code;
    use crate::test_vectors::{RFC_ACCESS_ACCEPT, RFC_ACCESS_REQUEST, SECRET};

    fn rfc_request() -> Packet {
        Packet::decode(&hex::decode(RFC_ACCESS_REQUEST).unwrap()).unwrap()
    }

    #[test]
    fn test_decrypt_rfc_password() {
        let request = rfc_request();
        let hidden = &request.get(AttributeType::UserPassword).unwrap().value;
        let password = decrypt_user_password(hidden, SECRET, &request.authenticator).unwrap();
        assert_eq!(password, b"arctangent");
    }

    #[test]
    fn test_encrypt_matches_rfc() {
        let request = rfc_request();
        let hidden = encrypt_user_password(b"arctangent", SECRET, &request.authenticator).unwrap();
        assert_eq!(
            hidden,
            request.get(AttributeType::UserPassword).unwrap().value
        );
    }

    #[test]
    fn test_long_password_chains_blocks() {
        let auth = [0x42u8; 16];
        let password = b"a-password-that-spans-more-than-two-blocks!";
        let hidden = encrypt_user_password(password, b"secret", &auth).unwrap();
        assert_eq!(hidden.len(), 48);
        assert_eq!(
            decrypt_user_password(&hidden, b"secret", &auth).unwrap(),
            password.to_vec()
        );
    }

    #[test]
    fn test_decrypt_rejects_bad_lengths() {
        let auth = [0u8; 16];
        assert!(decrypt_user_password(&[], b"s", &auth).is_err());
        assert!(decrypt_user_password(&[0; 15], b"s", &auth).is_err());
        assert!(decrypt_user_password(&[0; 144], b"s", &auth).is_err());
        assert!(encrypt_user_password(&[b'x'; 129], b"s", &auth).is_err());
    }

    #[test]
    fn test_rfc_response_authenticator() {
        let request = rfc_request();
        let accept = Packet::decode(&hex::decode(RFC_ACCESS_ACCEPT).unwrap()).unwrap();

        let mut unsigned = accept.clone();
        unsigned.authenticator = request.authenticator;
        let encoded = sign_response(&mut unsigned, SECRET, false).unwrap();

        assert_eq!(unsigned.authenticator, accept.authenticator);
        assert_eq!(encoded, hex::decode(RFC_ACCESS_ACCEPT).unwrap());
    }

    #[test]
    fn test_message_authenticator_verification() {
        let mut request = rfc_request();
        request.add_attribute(
            Attribute::new(AttributeType::MessageAuthenticator as u8, vec![0; 16]).unwrap(),
        );
        let digest = calculate_message_authenticator(&request.encode().unwrap(), SECRET);
        request.get_mut(AttributeType::MessageAuthenticator).unwrap().value = digest.to_vec();

        assert_eq!(verify_message_authenticator(&request, SECRET), Some(true));
        assert_eq!(verify_message_authenticator(&request, b"wrong"), Some(false));
        assert_eq!(verify_message_authenticator(&rfc_request(), SECRET), None);

        request.get_mut(AttributeType::MessageAuthenticator).unwrap().value = vec![1; 4];
        assert_eq!(verify_message_authenticator(&request, SECRET), Some(false));
    }

    #[test]
    fn test_signed_response_carries_message_authenticator() {
        let request = rfc_request();
        let mut response = Packet::new(Code::AccessReject, request.identifier, request.authenticator);
        let encoded = sign_response(&mut response, SECRET, true).unwrap();

        let decoded = Packet::decode(&encoded).unwrap();
        let ma = decoded.get(AttributeType::MessageAuthenticator).unwrap();
        assert_eq!(ma.value.len(), 16);

        // recompute over the packet as it looked before the response authenticator was set
        let mut check = decoded.clone();
        check.authenticator = request.authenticator;
        check.get_mut(AttributeType::MessageAuthenticator).unwrap().value = vec![0; 16];
        let expected = calculate_message_authenticator(&check.encode().unwrap(), SECRET);
        assert_eq!(ma.value, expected.to_vec());
    }
}
