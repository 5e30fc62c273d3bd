// Size of the chunk an agent reads per request; request content is ignored
pub const READ_CHUNK: usize = 1024;

// Width of an agent reply on the wire (u32, big-endian)
pub const REPLY_LEN: usize = 4;

// Payload the client sends to trigger a reply
pub const QUERY_TRIGGER: &[u8] = b"ping";

// Where `start` persists the shuffled endpoints by default
pub const DEFAULT_REGISTRY_PATH: &str = "agents.config";

// Host agents bind to by default
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";

// Largest cohort a single `start` may request
pub const MAX_AGENTS: usize = 10_000;
