use crate::domains::Domain;

/// Host of the foreground services that run domain sweeps.
pub trait ServiceHost: Send + Sync + 'static {
    /// Stops the service hosting `domain`'s work.
    fn stop_service(&self, domain: Domain);
}
