//! Capability registry
//!
//! Maps an exact provider id to its declared metadata and a constructor for
//! its capability. Registration happens once, during startup wiring; the
//! registry is read-only while requests are being handled.

use pastesuite_core::domain::capability::Capability;
use pastesuite_core::domain::ids::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::capability::{OcrEngine, TextStreamer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderClass {
    Cloud,
    Local,
}

impl fmt::Display for ProviderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderClass::Cloud => write!(f, "cloud"),
            ProviderClass::Local => write!(f, "local"),
        }
    }
}

type TextFactory = dyn Fn() -> Box<dyn TextStreamer> + Send + Sync;
type OcrFactory = dyn Fn() -> Box<dyn OcrEngine> + Send + Sync;

/// Constructor for a provider's capability instance
#[derive(Clone)]
pub enum CapabilityFactory {
    Text(Arc<TextFactory>),
    Ocr(Arc<OcrFactory>),
}

impl fmt::Debug for CapabilityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityFactory::Text(_) => f.write_str("CapabilityFactory::Text"),
            CapabilityFactory::Ocr(_) => f.write_str("CapabilityFactory::Ocr"),
        }
    }
}

/// Provider metadata plus its capability constructor
#[derive(Debug, Clone)]
pub struct ProviderRegistration {
    pub provider_id: ProviderId,
    pub display_name: String,
    pub capabilities: Vec<Capability>,
    pub requires_auth: bool,
    pub provider_class: ProviderClass,
    pub factory: CapabilityFactory,
}

impl ProviderRegistration {
    /// Registration for a text-streaming provider
    pub fn text<F>(
        provider_id: impl Into<ProviderId>,
        display_name: impl Into<String>,
        provider_class: ProviderClass,
        requires_auth: bool,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Box<dyn TextStreamer> + Send + Sync + 'static,
    {
        Self {
            provider_id: provider_id.into(),
            display_name: display_name.into(),
            capabilities: vec![Capability::Llm],
            requires_auth,
            provider_class,
            factory: CapabilityFactory::Text(Arc::new(factory)),
        }
    }

    /// Registration for an OCR provider
    pub fn ocr<F>(
        provider_id: impl Into<ProviderId>,
        display_name: impl Into<String>,
        provider_class: ProviderClass,
        requires_auth: bool,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Box<dyn OcrEngine> + Send + Sync + 'static,
    {
        Self {
            provider_id: provider_id.into(),
            display_name: display_name.into(),
            capabilities: vec![Capability::Ocr],
            requires_auth,
            provider_class,
            factory: CapabilityFactory::Ocr(Arc::new(factory)),
        }
    }

    /// Overrides the declared capability list
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Errors from registry lookups; these indicate a wiring bug in the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(ProviderId),

    #[error("Provider {0} does not provide a {1} capability")]
    WrongCapability(ProviderId, &'static str),
}

/// Registry of provider adapters
///
/// Registering an id that already exists replaces the previous entry but
/// keeps its position in [`CapabilityRegistry::list_all`].
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    providers: Vec<ProviderRegistration>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registers or replaces a provider
    pub fn register(&mut self, registration: ProviderRegistration) {
        debug!("Registering provider {}", registration.provider_id);
        match self
            .providers
            .iter_mut()
            .find(|p| p.provider_id == registration.provider_id)
        {
            Some(existing) => *existing = registration,
            None => self.providers.push(registration),
        }
    }

    /// Looks up a provider by exact id
    pub fn get(&self, provider_id: &ProviderId) -> Option<&ProviderRegistration> {
        self.providers.iter().find(|p| &p.provider_id == provider_id)
    }

    /// Returns all registrations in registration order
    pub fn list_all(&self) -> &[ProviderRegistration] {
        &self.providers
    }

    /// Builds a text-streaming instance for `provider_id`
    pub fn create_streamer(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Box<dyn TextStreamer>, RegistryError> {
        let registration = self
            .get(provider_id)
            .ok_or_else(|| RegistryError::UnknownProvider(provider_id.clone()))?;
        match &registration.factory {
            CapabilityFactory::Text(factory) => Ok(factory()),
            CapabilityFactory::Ocr(_) => Err(RegistryError::WrongCapability(
                provider_id.clone(),
                "text streaming",
            )),
        }
    }

    /// Builds an OCR instance for `provider_id`
    pub fn create_ocr(&self, provider_id: &ProviderId) -> Result<Box<dyn OcrEngine>, RegistryError> {
        let registration = self
            .get(provider_id)
            .ok_or_else(|| RegistryError::UnknownProvider(provider_id.clone()))?;
        match &registration.factory {
            CapabilityFactory::Ocr(factory) => Ok(factory()),
            CapabilityFactory::Text(_) => {
                Err(RegistryError::WrongCapability(provider_id.clone(), "ocr"))
            }
        }
    }
}
