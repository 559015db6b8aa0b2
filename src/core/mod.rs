//! Core orchestration for CallAudit.
//!
//! Houses the dependency-injection container and component factory, the
//! filename metadata grammar, the typed result model, the batch engine with
//! its adaptive sizer and model preloader, and the tabular aggregation
//! views.

pub mod aggregate;
pub mod batch;
pub mod factory;
pub mod naming;
pub mod report;
pub mod services;

pub use factory::ComponentFactory;
pub use services::ServiceContainer;
