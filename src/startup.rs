// Startup module - displays banner and routing summary
//
// Printed to stdout before the server starts so operators can see at a
// glance where the proxy listens, whether the gate is on, and which
// providers are reachable.

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// One line of the provider table
pub struct ProviderStatus {
    pub name: String,
    pub base_url: String,
    pub models: usize,
    pub is_default: bool,
}

/// Print the startup banner and routing summary
pub fn print_startup(config: &Config) {
    use colors::*;

    // Banner
    println!();
    println!("  {BOLD}{CYAN}a2o{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Anthropic Messages → OpenAI Chat Completions{RESET}");
    println!();

    // Config file status
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }

    // Auth mode
    if config.auth.is_configured() {
        println!("  {DIM}Auth:{RESET}   {GREEN}✓{RESET} basic auth");
    } else {
        println!("  {DIM}Auth:{RESET}   {YELLOW}!{RESET} {YELLOW}unauthenticated{RESET}");
    }
    println!();

    println!("  {DIM}Providers:{RESET}");
    for provider in provider_status(config) {
        print_provider_status(&provider);
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Proxy listening on {BOLD}{}{RESET}",
        config.bind_addr
    );
    println!(
        "  {DIM}  endpoint override header: {}{RESET}",
        config.routing.endpoint_header
    );
    println!();
}

/// Providers with the number of models routed to each
fn provider_status(config: &Config) -> Vec<ProviderStatus> {
    config
        .routing
        .providers
        .iter()
        .map(|(name, provider)| ProviderStatus {
            name: name.clone(),
            base_url: provider.base_url.clone(),
            models: config
                .routing
                .models
                .values()
                .filter(|p| *p == name)
                .count(),
            is_default: *name == config.routing.default_provider,
        })
        .collect()
}

fn print_provider_status(provider: &ProviderStatus) {
    use colors::*;

    let marker = if provider.is_default {
        format!("{GREEN}●{RESET}")
    } else {
        format!("{DIM}○{RESET}")
    };

    println!(
        "    {marker} {:<12} {DIM}{} ({} models){RESET}",
        provider.name, provider.base_url, provider.models
    );
}

/// Same summary as structured log lines, for JSON log consumers
pub fn log_startup(config: &Config) {
    tracing::info!(
        version = VERSION,
        bind = %config.bind_addr,
        basic_auth = config.auth.is_configured(),
        providers = config.routing.providers.len(),
        "a2o starting"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_status_counts_models() {
        let config = Config::default();
        let status = provider_status(&config);

        let openai = status.iter().find(|p| p.name == "openai").unwrap();
        assert!(openai.is_default);
        assert_eq!(openai.models, 4);

        let cerebras = status.iter().find(|p| p.name == "cerebras").unwrap();
        assert!(!cerebras.is_default);
        assert_eq!(cerebras.models, 3);
    }
}
