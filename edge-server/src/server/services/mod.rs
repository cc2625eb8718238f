pub mod activation;
pub mod cert;
pub mod credential;
pub mod https;
pub mod message_bus;
pub mod provisioning;

pub use activation::ActivationService;
pub use cert::CertService;
pub use credential::Credential;
pub use https::HttpsService;
pub use message_bus::MessageBusService;
pub use provisioning::ProvisioningService;
