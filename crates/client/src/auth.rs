//! Access token hand-off between the sign-in flow and the client.
//!
//! Token acquisition happens elsewhere and finishes at its own pace.
//! The client must not race it: [`TokenProvider::token`] waits for the
//! first published token, and later publishes replace it for
//! subsequent requests.

use tokio::sync::watch;

/// Errors from the token channel.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token source closed before publishing a token")]
    Closed,
}

/// Creates a connected writer/provider pair with no token published yet.
pub fn token_channel() -> (TokenWriter, TokenProvider) {
    let (tx, rx) = watch::channel(None);
    (TokenWriter { tx }, TokenProvider { rx })
}

/// Publishing side, held by the sign-in flow.
pub struct TokenWriter {
    tx: watch::Sender<Option<String>>,
}

impl TokenWriter {
    /// Publishes a fresh access token, replacing any previous one.
    pub fn publish(&self, token: impl Into<String>) {
        let _ = self.tx.send(Some(token.into()));
    }
}

/// Consuming side, held by the client. Cheap to clone.
#[derive(Clone)]
pub struct TokenProvider {
    rx: watch::Receiver<Option<String>>,
}

impl TokenProvider {
    /// Creates a provider over a token that never changes.
    pub fn fixed(token: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(Some(token.into()));
        Self { rx }
    }

    /// Returns the current token, waiting for the first publish if none
    /// has arrived yet.
    pub async fn token(&self) -> Result<String, AuthError> {
        let mut rx = self.rx.clone();
        let value = rx.wait_for(|t| t.is_some()).await.map_err(|_| AuthError::Closed)?;
        Ok(value.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fixed_token_is_immediately_available() {
        let tokens = TokenProvider::fixed("abc");
        assert_eq!(tokens.token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn token_waits_for_first_publish() {
        let (writer, tokens) = token_channel();

        let publish = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            writer.publish("t1");
        };
        let (token, ()) = tokio::join!(tokens.token(), publish);

        assert_eq!(token.unwrap(), "t1");
    }

    #[tokio::test]
    async fn later_publish_replaces_token() {
        let (writer, tokens) = token_channel();
        writer.publish("t1");
        assert_eq!(tokens.token().await.unwrap(), "t1");

        writer.publish("t2");
        assert_eq!(tokens.token().await.unwrap(), "t2");
    }

    #[tokio::test]
    async fn dropped_writer_without_publish_is_an_error() {
        let (writer, tokens) = token_channel();
        drop(writer);
        assert!(matches!(tokens.token().await, Err(AuthError::Closed)));
    }
}
