use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::api_client::{ApiClient, ClientError};
use crate::api::UserDto;

/// Lifecycle of the dashboard's authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    Authenticated,
    /// The background revalidation found the token dead. Terminal until
    /// the next explicit login.
    SessionExpired,
}

#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    state: SessionState,
    user: Option<UserDto>,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: SessionState::LoggedOut,
            user: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user(&self) -> Option<&UserDto> {
        self.user.as_ref()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        self.state = SessionState::LoggingIn;

        match self.client.login(username, password).await {
            Ok(data) => {
                tracing::info!(username = %data.user.username, "Session established");
                self.user = Some(data.user);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => {
                self.user = None;
                self.state = SessionState::LoggedOut;
                Err(e)
            }
        }
    }

    pub async fn logout(&mut self) {
        if let Err(e) = self.client.logout().await {
            // Token is discarded locally either way.
            tracing::debug!("Logout call failed: {e}");
        }
        self.user = None;
        self.state = SessionState::LoggedOut;
    }

    /// Re-checks the token against the server. Called by the
    /// revalidation timer; an unauthorized answer expires the session,
    /// transport errors leave it alone until the next tick.
    pub async fn revalidate(&mut self) {
        if self.state != SessionState::Authenticated {
            return;
        }

        match self.client.verify().await {
            Ok(data) => {
                self.user = Some(data.user);
            }
            Err(ClientError::Unauthorized(msg)) => {
                tracing::warn!("Session expired: {msg}");
                self.client.set_token(None);
                self.user = None;
                self.state = SessionState::SessionExpired;
            }
            Err(e) => {
                tracing::debug!("Session revalidation skipped: {e}");
            }
        }
    }
}

/// Spawns the periodic revalidation task. The caller holds the handle
/// and aborts it on logout or shutdown.
pub fn spawn_revalidator(session: Arc<Mutex<Session>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; the session was just
        // verified by login, so skip it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let mut session = session.lock().await;
            session.revalidate().await;
            if session.state() == SessionState::SessionExpired {
                break;
            }
        }
    })
}
