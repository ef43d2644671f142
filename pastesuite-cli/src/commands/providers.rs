//! Providers command handler

use anyhow::Result;
use colored::*;
use pastesuite_providers::{ProviderClass, ProviderRegistration, builtin_registry};

use crate::config::Config;

/// List all built-in providers
pub fn list_providers(config: &Config) -> Result<()> {
    let registry = builtin_registry(config.engine.request_timeout);
    let providers = registry.list_all();

    if providers.is_empty() {
        println!("{}", "No providers registered.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} provider(s):", providers.len()).bold());
    println!();
    for provider in providers {
        print_provider_summary(provider);
    }
    Ok(())
}

fn print_provider_summary(provider: &ProviderRegistration) {
    let class = match provider.provider_class {
        ProviderClass::Cloud => "cloud".blue(),
        ProviderClass::Local => "local".green(),
    };
    let capabilities = provider
        .capabilities
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    println!(
        "  {} {} {}",
        "▸".cyan(),
        provider.provider_id.as_str().bold(),
        provider.display_name.dimmed()
    );
    println!("    Class:        {}", class);
    println!("    Capabilities: {}", capabilities);
    println!(
        "    API key:      {}",
        if provider.requires_auth { "required" } else { "not needed" }
    );
    println!();
}
