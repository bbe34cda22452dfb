const MONITOR_ENV: &str = "MONITOR_ENV";

const NODE_ENV: &str = "NODE_ENV";

const DEFAULT_ENV: &str = "production";

/// Name of the environment to resolve a profile for
pub fn get_environment() -> String {
    select_environment(
        std::env::var(MONITOR_ENV).ok(),
        std::env::var(NODE_ENV).ok(),
    )
}

/// First non-empty value wins, falling back to `production`
pub fn select_environment(monitor_env: Option<String>, node_env: Option<String>) -> String {
    [monitor_env, node_env]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}
