//! The capabilities this server ships.
//!
//! Placeholder content demonstrating each namespace of the kernel; a real
//! deployment replaces these with its own registrations. Registration is
//! the only integration surface between the kernel and capability code:
//! `register_tool` / `register_resource` / `register_prompt` on the
//! registry, each taking a name, description, argument shape, and handler.

pub mod prompts;
pub mod resources;
pub mod tools;

use crate::config::Config;
use crate::error::RegistryError;
use crate::registry::CapabilityRegistry;

/// Builds a registry populated with every shipped capability.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] on a name collision, which is a
/// startup configuration error.
pub fn build_registry(config: &Config) -> Result<CapabilityRegistry, RegistryError> {
    let mut registry = CapabilityRegistry::new();

    tools::register(&mut registry, &config.fetch)?;
    resources::register(&mut registry, &config.resources)?;
    prompts::register(&mut registry)?;

    Ok(registry)
}
