//! RADIUS protocol support for Radldap
//!
//! Implements the subset of RFC 2865 and RFC 3579 the bridge needs:
//!
//! - Packet encoding and decoding
//! - `User-Password` hiding (MD5 chaining with the shared secret)
//! - Response Authenticator calculation
//! - Message-Authenticator (HMAC-MD5) verification and signing
//! - A UDP packet server dispatching Access-Requests to a [`Handler`]

pub mod attributes;
pub mod auth;
pub mod packet;
pub mod server;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_message_authenticator, calculate_response_authenticator, decrypt_user_password,
    encrypt_user_password, sign_response, verify_message_authenticator,
};
pub use packet::{Code, Packet, PacketError};
pub use server::{Handler, PacketServer, Request};

#[cfg(test)]
pub(crate) mod test_vectors {
    //! RFC 2865 section 7.1 example exchange, shared secret "xyzzy5461".

    pub const SECRET: &[u8] = b"xyzzy5461";

    /// nemo / arctangent from NAS 192.168.1.16, port 3
    pub const RFC_ACCESS_REQUEST: &str = concat!(
        "010000380f403f9473978057bd83d5cb98f4227a",
        "01066e656d6f",
        "02120dbe708d93d413ce3196e43f782a0aee",
        "0406c0a80110",
        "050600000003",
    );

    /// Access-Accept with Service-Type, Login-Service and Login-IP-Host
    pub const RFC_ACCESS_ACCEPT: &str = concat!(
        "0200002686fe220e7624ba2a1005f6bf9b55e0b2",
        "060600000001",
        "0f0600000000",
        "0e06c0a80103",
    );
}
