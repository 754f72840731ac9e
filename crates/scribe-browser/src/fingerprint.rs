use rand::Rng;
use scribe_core::BrowserConfig;

/// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Identity presented by a browser session
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Fingerprint for the configured viewport; the user agent is the
    /// configured one or a random desktop agent.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let user_agent = config.user_agent.clone().unwrap_or_else(|| {
            let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
            USER_AGENTS[idx].to_string()
        });

        Self {
            user_agent,
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }
}
