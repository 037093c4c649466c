//! Opaque bearer tokens.
//!
//! Each purpose has its own type so an accept token can never be passed
//! where a decline or check-in token is expected. All tokens share one
//! format: 32 random bytes, base64url without padding (43 characters).
//!
//! Tokens are compared for exact equality only. Lookups that miss yield
//! `NotFound`; they never reveal whether a token existed under another
//! purpose.

use std::fmt;

use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{GuestlistError, Result};

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 32;

/// Longest token accepted from a request.
///
/// Freshly issued tokens are 43 characters. Rows imported from older
/// systems may carry other formats, so parsing only bounds the length and
/// the alphabet.
pub const MAX_TOKEN_LEN: usize = 128;

/// Behaviour shared by every token type.
pub trait OpaqueToken: Sized {
    /// Human readable purpose, used in `NotFound` errors.
    const PURPOSE: &'static str;

    /// Wraps a raw value without validation.
    fn from_raw(raw: String) -> Self;

    /// Borrow the raw token value.
    fn as_str(&self) -> &str;

    /// Parses a token received from a request path or body.
    ///
    /// # Errors
    ///
    /// Returns [`GuestlistError::Validation`] if the value is empty, longer
    /// than [`MAX_TOKEN_LEN`] or contains characters outside the base64url
    /// alphabet.
    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GuestlistError::Validation(format!("{} is required", Self::PURPOSE)));
        }
        if raw.len() > MAX_TOKEN_LEN
            || !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(GuestlistError::Validation(format!("malformed {}", Self::PURPOSE)));
        }
        Ok(Self::from_raw(raw.to_owned()))
    }
}

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident, $purpose:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl OpaqueToken for $name {
            const PURPOSE: &'static str = $purpose;

            fn from_raw(raw: String) -> Self {
                Self(raw)
            }

            fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let prefix: String = self.0.chars().take(6).collect();
                write!(f, "{}({prefix}…)", stringify!($name))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_token!(
    /// Accepts an invitation when presented on the RSVP landing link.
    AcceptToken,
    "accept token"
);
opaque_token!(
    /// Declines an invitation when presented on the RSVP landing link.
    DeclineToken,
    "decline token"
);
opaque_token!(
    /// Embedded in invitation emails to record the first open.
    TrackingToken,
    "tracking token"
);
opaque_token!(
    /// Admits a guest or accompanying guest at the door.
    CheckInToken,
    "check-in token"
);

/// Mints fresh tokens from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    /// Issues a new random token of the requested type.
    #[must_use]
    pub fn issue<T: OpaqueToken>(&self) -> T {
        T::from_raw(random_token())
    }
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn issued_tokens_are_43_url_safe_chars() {
        let token: CheckInToken = TokenIssuer.issue();
        assert_eq!(token.as_str().len(), 43);
        assert!(
            token
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }

    #[test]
    fn issued_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1_000)
            .map(|_| TokenIssuer.issue::<AcceptToken>().to_string())
            .collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn parse_round_trips_issued_tokens() {
        let issued: DeclineToken = TokenIssuer.issue();
        let parsed = DeclineToken::parse(issued.as_str()).unwrap();
        assert_eq!(parsed, issued);
    }

    #[test]
    fn parse_rejects_empty_and_foreign_characters() {
        assert!(matches!(
            AcceptToken::parse("   "),
            Err(GuestlistError::Validation(msg)) if msg == "accept token is required"
        ));
        assert!(AcceptToken::parse("abc/def").is_err());
        assert!(AcceptToken::parse(&"a".repeat(MAX_TOKEN_LEN + 1)).is_err());
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let token = CheckInToken::from_raw("abcdefghijklmnop".to_owned());
        assert_eq!(format!("{token:?}"), "CheckInToken(abcdef…)");
    }
}
