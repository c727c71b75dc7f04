//! Modules bundled with the parley binary.

pub mod echo;
pub mod ping;

use parley_gateway::{Module, ModuleRegistry};

pub use {echo::EchoModule, ping::PingModule};

/// Register every bundled module. Each still needs `enable = true` in its
/// config block to run.
pub fn register_all(registry: &mut ModuleRegistry) -> parley_gateway::Result<()> {
    registry.register(Module::new(ping::NAME, PingModule::default))?;
    registry.register(Module::new(echo::NAME, EchoModule::default))?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_bundled_modules() {
        let mut registry = ModuleRegistry::new();
        register_all(&mut registry).unwrap();
        assert_eq!(registry.names(), ["ping", "echo"]);
        assert!(register_all(&mut registry).is_err());
    }
}
