//! PLAIN mechanism (RFC 4616).
//!
//! Single round: the initial response carries the credentials as
//! `authzid NUL authcid NUL password` with an empty authzid. Used when the
//! server proxies authentication to LDAP.

use zeroize::Zeroizing;

use crate::error::Result;
use crate::mechanism::ChallengeEvaluator;

/// Evaluator for the PLAIN mechanism.
pub struct PlainEvaluator {
    user: String,
    password: Zeroizing<String>,
    complete: bool,
}

impl PlainEvaluator {
    /// Create a PLAIN evaluator for the given credentials.
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: Zeroizing::new(password.to_string()),
            complete: false,
        }
    }
}

impl ChallengeEvaluator for PlainEvaluator {
    fn evaluate(&mut self, _challenge: &[u8]) -> Result<Vec<u8>> {
        if self.complete {
            return Ok(Vec::new());
        }
        let mut response = Vec::with_capacity(2 + self.user.len() + self.password.len());
        response.push(0);
        response.extend_from_slice(self.user.as_bytes());
        response.push(0);
        response.extend_from_slice(self.password.as_bytes());
        self.complete = true;
        Ok(response)
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }
}
