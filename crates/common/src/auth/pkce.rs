//! PKCE (RFC 7636) helpers for the authorization-code flow

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 32 random bytes, base64url encoded (43 characters).
pub fn generate_code_verifier() -> String {
    random_token()
}

/// `BASE64URL(SHA256(verifier))`
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random CSRF state token.
pub fn generate_state() -> String {
    random_token()
}

/// Compare state tokens without short-circuiting on the first difference.
pub fn validate_state(expected: &str, actual: &str) -> bool {
    expected.len() == actual.len()
        && expected.bytes().zip(actual.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Verifier, challenge and state for one authorization request.
#[derive(Clone)]
pub struct PKCEChallenge {
    /// Kept secret until the code exchange.
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PKCEChallenge {
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    pub const fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PKCEChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PKCEChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .field("state", &self.state)
            .finish()
    }
}
