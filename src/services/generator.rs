use crate::models::{GenerationSettings, MAX_COUNT, MIN_COUNT, UuidVersion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Errors that can occur while generating identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Count must be between 1 and 1000, got {0}")]
    InvalidCount(u32),

    #[error("UUID version {0} is not supported, only v4 can be generated")]
    UnsupportedVersion(UuidVersion),

    #[error("No secure random number source is available")]
    RngUnavailable,

    #[error("Provider {provider} failed: {reason}")]
    Provider {
        provider: &'static str,
        reason: String,
    },
}

/// One source of v4 identifiers.
///
/// Providers are tried in order by [`IdentifierGenerator`]; the first secure provider
/// that reports itself available wins.
#[cfg_attr(test, mockall::automock)]
pub trait UuidProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the randomness source behind this provider can be used right now.
    fn is_available(&self) -> bool;

    /// Whether the provider draws from a cryptographically secure source.
    fn is_secure(&self) -> bool;

    /// Produce `count` canonical lowercase hyphenated v4 identifiers.
    fn generate(&self, count: usize) -> Result<Vec<String>, GenerationError>;
}

/// Probe the operating system RNG once per process.
fn os_rng_available() -> bool {
    static PROBE: OnceLock<bool> = OnceLock::new();
    *PROBE.get_or_init(|| {
        let mut probe = [0u8; 1];
        let available = getrandom::fill(&mut probe).is_ok();
        if !available {
            tracing::warn!("Operating system RNG is not available");
        }
        available
    })
}

/// Turn 16 random bytes into a canonical v4 identifier.
///
/// The top nibble of byte 6 becomes the version (`0x40`) and the top two bits of byte 8
/// the RFC 4122 variant (`0b10`). Hyphens go after hex digits 8, 12, 16 and 20.
pub fn uuid_from_random_bytes(mut bytes: [u8; 16]) -> String {
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push(HEX_CHARS[(byte >> 4) as usize] as char);
        out.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
    }
    out
}

/// One `Uuid::new_v4()` call per identifier.
#[derive(Debug, Clone)]
pub struct NativeUuidProvider {
    enabled: bool,
}

impl NativeUuidProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl UuidProvider for NativeUuidProvider {
    fn name(&self) -> &'static str {
        "native"
    }

    fn is_available(&self) -> bool {
        self.enabled && os_rng_available()
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn generate(&self, count: usize) -> Result<Vec<String>, GenerationError> {
        let mut buffer = Uuid::encode_buffer();
        Ok((0..count)
            .map(|_| {
                Uuid::new_v4()
                    .hyphenated()
                    .encode_lower(&mut buffer)
                    .to_string()
            })
            .collect())
    }
}

/// Fills `16 * count` bytes with a single OS RNG call and slices them per identifier.
#[derive(Debug, Clone)]
pub struct ByteFillProvider {
    enabled: bool,
}

impl ByteFillProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl UuidProvider for ByteFillProvider {
    fn name(&self) -> &'static str {
        "byte-fill"
    }

    fn is_available(&self) -> bool {
        self.enabled && os_rng_available()
    }

    fn is_secure(&self) -> bool {
        true
    }

    fn generate(&self, count: usize) -> Result<Vec<String>, GenerationError> {
        let mut random = vec![0u8; count * 16];
        getrandom::fill(&mut random).map_err(|e| GenerationError::Provider {
            provider: self.name(),
            reason: e.to_string(),
        })?;

        Ok(random
            .chunks_exact(16)
            .map(|chunk| {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(chunk);
                uuid_from_random_bytes(bytes)
            })
            .collect())
    }
}

/// Non-cryptographic last resort, seeded from the clock.
///
/// Never part of the default provider scan. Only reachable through
/// [`IdentifierGenerator::fallback`] and [`IdentifierGenerator::generate_insecure`].
#[derive(Debug)]
pub struct PseudoRandomProvider {
    rng: Mutex<SmallRng>,
}

impl PseudoRandomProvider {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self::with_seed(nanos)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }
}

impl Default for PseudoRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidProvider for PseudoRandomProvider {
    fn name(&self) -> &'static str {
        "pseudo-random"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_secure(&self) -> bool {
        false
    }

    fn generate(&self, count: usize) -> Result<Vec<String>, GenerationError> {
        let mut rng = self.rng.lock().map_err(|_| GenerationError::Provider {
            provider: self.name(),
            reason: "generator state poisoned".to_string(),
        })?;

        Ok((0..count)
            .map(|_| {
                let mut bytes = [0u8; 16];
                rng.fill(&mut bytes);
                uuid_from_random_bytes(bytes)
            })
            .collect())
    }
}

/// Produces batches of v4 identifiers from an ordered list of secure providers.
///
/// Small batches are produced in one go. Batches larger than the chunk threshold are
/// split into chunks with a cooperative yield between them, so a 1000-identifier
/// request never holds the event loop for the whole batch.
///
/// # Fallback order
///
/// 1. [`NativeUuidProvider`]
/// 2. [`ByteFillProvider`]
///
/// When a provider fails a chunk, the chunk is retried one identifier at a time with
/// the same provider before moving on to the next one. The insecure
/// [`PseudoRandomProvider`] is kept aside and never used implicitly.
pub struct IdentifierGenerator {
    providers: Vec<Box<dyn UuidProvider>>,
    fallback: PseudoRandomProvider,
    chunk_threshold: usize,
    chunk_size: usize,
}

impl IdentifierGenerator {
    /// Build the default provider chain from settings.
    pub fn new(settings: &GenerationSettings) -> Self {
        Self::with_providers(
            vec![
                Box::new(NativeUuidProvider::new(settings.native_enabled)),
                Box::new(ByteFillProvider::new(settings.byte_fill_enabled)),
            ],
            settings,
        )
    }

    /// Build a generator over a custom provider chain, tried in the given order.
    pub fn with_providers(
        providers: Vec<Box<dyn UuidProvider>>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            providers,
            fallback: PseudoRandomProvider::new(),
            chunk_threshold: settings.chunk_threshold.max(1) as usize,
            chunk_size: settings.chunk_size.max(1) as usize,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// The provider the next generation will start with, if any.
    pub fn active_provider(&self) -> Option<&dyn UuidProvider> {
        self.secure_providers().next()
    }

    /// Whether any secure provider is available.
    pub fn is_available(&self) -> bool {
        self.active_provider().is_some()
    }

    /// Generate `count` identifiers of the given version.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::InvalidCount`] when `count` is outside `1..=1000`
    /// - [`GenerationError::UnsupportedVersion`] for anything but v4
    /// - [`GenerationError::RngUnavailable`] when no secure provider can produce identifiers
    pub async fn generate(
        &self,
        count: u32,
        version: UuidVersion,
    ) -> Result<Vec<String>, GenerationError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
            return Err(GenerationError::InvalidCount(count));
        }
        if !version.is_supported() {
            return Err(GenerationError::UnsupportedVersion(version));
        }
        if !self.is_available() {
            tracing::error!("No secure UUID provider available");
            return Err(GenerationError::RngUnavailable);
        }

        let count = count as usize;
        if count <= self.chunk_threshold {
            return self.generate_chunk(count);
        }

        let mut identifiers = Vec::with_capacity(count);
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(self.chunk_size);
            identifiers.extend(self.generate_chunk(chunk)?);
            remaining -= chunk;

            if remaining > 0 {
                tokio::task::yield_now().await;
            }
        }

        tracing::debug!(
            "Generated {} identifiers in chunks of {}",
            identifiers.len(),
            self.chunk_size
        );
        Ok(identifiers)
    }

    /// The insecure last-resort provider, for degraded environments only.
    pub fn fallback(&self) -> &PseudoRandomProvider {
        &self.fallback
    }

    /// Generate identifiers with the insecure fallback provider.
    pub fn generate_insecure(&self, count: u32) -> Result<Vec<String>, GenerationError> {
        if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
            return Err(GenerationError::InvalidCount(count));
        }
        tracing::warn!(
            "Generating {} identifiers with the non-cryptographic fallback",
            count
        );
        self.fallback.generate(count as usize)
    }

    fn secure_providers(&self) -> impl Iterator<Item = &dyn UuidProvider> {
        self.providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| p.is_secure() && p.is_available())
    }

    fn generate_chunk(&self, count: usize) -> Result<Vec<String>, GenerationError> {
        for provider in self.secure_providers() {
            match provider.generate(count) {
                Ok(identifiers) => return Ok(identifiers),
                Err(e) => {
                    tracing::warn!("Provider {} failed a batch of {}: {}", provider.name(), count, e);
                }
            }

            if count > 1 {
                match Self::generate_one_by_one(provider, count) {
                    Ok(identifiers) => {
                        tracing::info!(
                            "Provider {} recovered with single-item generation",
                            provider.name()
                        );
                        return Ok(identifiers);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Provider {} failed single-item generation: {}",
                            provider.name(),
                            e
                        );
                    }
                }
            }
        }

        Err(GenerationError::RngUnavailable)
    }

    fn generate_one_by_one(
        provider: &dyn UuidProvider,
        count: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let mut identifiers = Vec::with_capacity(count);
        for _ in 0..count {
            identifiers.extend(provider.generate(1)?);
        }
        Ok(identifiers)
    }
}
