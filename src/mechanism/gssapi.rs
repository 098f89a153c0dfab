//! GSSAPI mechanism (Kerberos).
//!
//! Thin adapter over `libgssapi`: each sub-challenge is one `step` of a
//! client security context targeting `serviceName@host`. Credential
//! acquisition and context steps may block on traffic to the KDC; that
//! latency is opaque to the handshake core.

use libgssapi::context::{ClientCtx, CtxFlags, SecurityContext};
use libgssapi::credential::{Cred, CredUsage};
use libgssapi::name::Name;
use libgssapi::oid::{OidSet, GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE, GSS_NT_USER_NAME};

use crate::error::{Error, Result};
use crate::mechanism::ChallengeEvaluator;

/// Evaluator for the GSSAPI mechanism.
pub struct GssapiEvaluator {
    ctx: ClientCtx,
}

impl GssapiEvaluator {
    /// Create a GSSAPI evaluator for `user` against `serviceName@host`.
    ///
    /// An empty `user` falls back to the default credential from the
    /// ticket cache.
    pub fn new(user: &str, host: &str, service_name: &str) -> Result<Self> {
        let mut mechs = OidSet::new().map_err(gss_err)?;
        mechs.add(&GSS_MECH_KRB5).map_err(gss_err)?;

        let principal = if user.is_empty() {
            None
        } else {
            Some(Name::new(user.as_bytes(), Some(&GSS_NT_USER_NAME)).map_err(gss_err)?)
        };
        let cred =
            Cred::acquire(principal.as_ref(), None, CredUsage::Initiate, Some(&mechs))
                .map_err(gss_err)?;

        let target = Name::new(
            format!("{service_name}@{host}").as_bytes(),
            Some(&GSS_NT_HOSTBASED_SERVICE),
        )
        .map_err(gss_err)?;

        let ctx = ClientCtx::new(
            Some(cred),
            target,
            CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_SEQUENCE_FLAG,
            Some(&GSS_MECH_KRB5),
        );

        Ok(Self { ctx })
    }
}

impl ChallengeEvaluator for GssapiEvaluator {
    fn evaluate(&mut self, challenge: &[u8]) -> Result<Vec<u8>> {
        let token = if challenge.is_empty() {
            None
        } else {
            Some(challenge)
        };
        match self.ctx.step(token, None).map_err(gss_err)? {
            Some(output) => Ok(output.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    fn is_complete(&self) -> bool {
        self.ctx.is_complete()
    }

    fn dispose(&mut self) -> Result<()> {
        // The context releases its GSS handles on drop.
        Ok(())
    }
}

fn gss_err(err: libgssapi::error::Error) -> Error {
    Error::Mechanism(format!("GSSAPI: {err}"))
}
