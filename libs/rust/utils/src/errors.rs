//env
pub const GRAPH_API_KEY_NOT_SET: &str = "GRAPH_API_KEY not set, querying the subgraph without credentials";
pub const AAVE_CHAINS_PARSE_FAILED: &str = "Failed to parse AAVE_CHAINS override";

//config
pub const CONFIG_READ_FAILED: &str = "Failed to read config file";
pub const CONFIG_PARSE_FAILED: &str = "Failed to parse config file";

//clients
pub const HTTP_CLIENT_BUILD_FAILED: &str = "Failed to build HTTP client";
pub const INVALID_CONTRACT_ADDRESS: &str = "Invalid contract address";
pub const INVALID_RPC_URL: &str = "Invalid RPC URL";
