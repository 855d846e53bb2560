/// Client configuration options.
///
/// ```
/// use ot_sync::client::ClientConfig;
///
/// let config = ClientConfig {
///     session_id: Some("alice".into()),
///     ..Default::default()
/// };
/// assert!(config.enable_logging);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Session id to announce to the server; a random one is generated when
    /// `None`
    pub session_id: Option<String>,
    /// Emit `tracing` warnings for rejected messages
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            session_id: None,
            enable_logging: true,
        }
    }
}
