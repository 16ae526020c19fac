//! Principal persistence in the server-side session.

use tower_sessions::Session;
use tracing::debug;

use crate::error::Result;
use crate::principal::Principal;

/// Session keys used for storing data
pub struct SessionKeys;

impl SessionKeys {
    pub const PRINCIPAL: &'static str = "principal";
}

/// Reads and writes the principal attached to a browser session.
pub struct PrincipalStore;

impl PrincipalStore {
    /// Attach `principal` to the session, issuing a fresh session id.
    pub async fn login(session: &Session, principal: &Principal) -> Result<()> {
        session.cycle_id().await?;
        session.insert(SessionKeys::PRINCIPAL, principal).await?;
        session.save().await?;

        debug!(account = %principal.account_access_key, "Session created");
        Ok(())
    }

    pub async fn principal(session: &Session) -> Result<Option<Principal>> {
        Ok(session.get(SessionKeys::PRINCIPAL).await?)
    }

    /// Destroy the session (logout).
    pub async fn logout(session: &Session) -> Result<()> {
        session.flush().await?;
        debug!("Session destroyed");
        Ok(())
    }
}
