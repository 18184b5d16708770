//! Connection identity

use crate::request::SampleRequest;

/// Identity of a logical broker connection
///
/// Two requests map to the same key when server, port, username, password
/// and client id all match. Topic, body, QoS and retain do not take part.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    server: String,
    port: u16,
    client_id: String,
    username: String,
    password: String,
}

impl ConnectionKey {
    /// Build a key from its parts
    pub fn new(
        server: impl Into<String>,
        port: u16,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            client_id: client_id.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Key for the connection a request needs
    pub fn of(request: &SampleRequest) -> Self {
        Self::new(
            request.server.as_str(),
            request.port,
            request.client_id.as_str(),
            request.username.as_str(),
            request.password.as_str(),
        )
    }

    /// Broker host
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Broker port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client identifier
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Username, empty when anonymous
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether credentials should be sent on connect
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.username.is_empty() {
            write!(f, "tcp://{}:{}#{}", self.server, self.port, self.client_id)
        } else {
            write!(
                f,
                "tcp://{}@{}:{}#{}",
                self.username, self.server, self.port, self.client_id
            )
        }
    }
}

impl std::fmt::Debug for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionKey")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QoS;
    use std::collections::HashSet;

    fn base() -> SampleRequest {
        SampleRequest::new("broker.local", "t/1")
            .with_client_id("c1")
            .with_credentials("alice", "pw")
    }

    #[test]
    fn test_key_ignores_message_fields() {
        let a = base();
        let b = base()
            .with_topic("other/topic")
            .with_message_body("{\"x\":1}")
            .with_qos(QoS::ExactlyOnce)
            .with_retain(true)
            .with_reuse_connection(false);

        assert_eq!(ConnectionKey::of(&a), ConnectionKey::of(&b));

        let mut set = HashSet::new();
        set.insert(ConnectionKey::of(&a));
        assert!(set.contains(&ConnectionKey::of(&b)));
    }

    #[test]
    fn test_key_distinguishes_identity_fields() {
        let a = ConnectionKey::of(&base());
        assert_ne!(a, ConnectionKey::of(&base().with_client_id("c2")));
        assert_ne!(a, ConnectionKey::of(&base().with_credentials("bob", "pw")));
        assert_ne!(a, ConnectionKey::of(&base().with_credentials("alice", "other")));
        assert_ne!(a, ConnectionKey::of(&base().with_port(8883)));
        assert_ne!(
            a,
            ConnectionKey::of(&SampleRequest {
                server: "broker.remote".into(),
                ..base()
            })
        );
    }

    #[test]
    fn test_display_and_debug_hide_password() {
        let key = ConnectionKey::of(&base());
        assert_eq!(key.to_string(), "tcp://alice@broker.local:1883#c1");
        assert!(!format!("{key:?}").contains("\"pw\""));

        let anon = ConnectionKey::new("h", 1883, "c", "", "");
        assert_eq!(anon.to_string(), "tcp://h:1883#c");
        assert!(!anon.has_credentials());
    }
}
