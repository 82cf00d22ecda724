pub(crate) const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3001";
pub(crate) const DEFAULT_P2P_ADDR: &str = "127.0.0.1:6001";
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;
/// Upper bound on one framed peer message; a full chain travels as one line.
pub(crate) const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;
/// Messages queued for one peer before it is considered stalled.
pub(crate) const PEER_QUEUE_CAPACITY: usize = 256;
