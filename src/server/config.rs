/// Server configuration options.
///
/// ```
/// use ot_sync::server::ServerConfig;
///
/// let config = ServerConfig {
///     initial_document: "# Notes\n".into(),
///     ..Default::default()
/// };
/// assert!(config.enable_logging);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Document text at revision 0
    pub initial_document: String,
    /// Emit `tracing` warnings for rejected submissions and closed sessions
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            initial_document: String::new(),
            enable_logging: true,
        }
    }
}
