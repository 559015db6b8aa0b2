//! Service container for dependency management and injection.
//!
//! This module provides a centralized service container that manages
//! the lifecycle of services and components, enabling clean dependency
//! injection throughout the application.

use crate::{Result, config::ConfigService, core::ComponentFactory};
use std::sync::Arc;

/// Service container for dependency injection and service management.
///
/// The service container holds references to core services and provides
/// a centralized way to access them throughout the application.
///
/// # Design Principles
///
/// - **Single Source of Truth**: All services are managed through the container
/// - **Dependency Injection**: Components receive dependencies explicitly
/// - **Configuration Isolation**: Services are decoupled from global configuration
/// - **Test Friendliness**: Easy to mock and test individual components
///
/// # Examples
///
/// ```rust
/// use callaudit::core::ServiceContainer;
/// use callaudit::config::TestConfigService;
/// use std::sync::Arc;
///
/// # fn example() -> callaudit::Result<()> {
/// let config_service = Arc::new(TestConfigService::with_defaults());
/// let container = ServiceContainer::new(config_service)?;
/// let factory = container.component_factory();
/// # Ok(())
/// # }
/// ```
pub struct ServiceContainer {
    config_service: Arc<dyn ConfigService>,
    component_factory: ComponentFactory,
}

impl ServiceContainer {
    /// Create a new service container with the given configuration service.
    ///
    /// # Errors
    ///
    /// Returns an error if component factory creation fails.
    pub fn new(config_service: Arc<dyn ConfigService>) -> Result<Self> {
        let component_factory = ComponentFactory::new(config_service.as_ref())?;

        Ok(Self {
            config_service,
            component_factory,
        })
    }

    /// Get a reference to the configuration service.
    pub fn config_service(&self) -> &Arc<dyn ConfigService> {
        &self.config_service
    }

    /// Get a reference to the component factory.
    pub fn component_factory(&self) -> &ComponentFactory {
        &self.component_factory
    }

    /// Reload all services and components.
    ///
    /// Triggers a reload of the configuration service and recreates the
    /// component factory with the updated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration reloading or factory recreation
    /// fails.
    pub fn reload(&mut self) -> Result<()> {
        self.config_service.reload()?;
        self.component_factory = ComponentFactory::new(self.config_service.as_ref())?;
        Ok(())
    }
}
