//! Injectable choice among equally valid template variants.
//!
//! The engine never reaches for randomness directly. It asks a
//! [`VariantPicker`] for an index, which lets tests pin exact output while
//! production can rotate phrasing.

use crate::config::{PickerConfig, PickerMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Chooses one of `len` variants for the slot identified by `key`.
///
/// Implementations must return an index below `len` whenever `len > 0`.
/// Callers never ask with `len == 0`.
pub trait VariantPicker: Send + Sync {
    fn pick(&self, key: &str, len: usize) -> usize;
}

/// Always the first variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstVariant;

impl VariantPicker for FirstVariant {
    fn pick(&self, _key: &str, _len: usize) -> usize {
        0
    }
}

/// Reproducible pseudo-random choice.
///
/// Each call seeds a fresh [`StdRng`] from the configured seed and the slot
/// key, so the same seed and key always yield the same variant and no state
/// is shared between callers.
#[derive(Debug, Clone, Copy)]
pub struct SeededPicker {
    seed: u64,
}

impl SeededPicker {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl VariantPicker for SeededPicker {
    fn pick(&self, key: &str, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        rng.gen_range(0..len)
    }
}

/// Thread-local randomness for production phrasing rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandomPicker;

impl VariantPicker for ThreadRandomPicker {
    fn pick(&self, _key: &str, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Build the picker described by `config`.
pub fn picker_from_config(config: &PickerConfig) -> Arc<dyn VariantPicker> {
    match config.mode {
        PickerMode::First => Arc::new(FirstVariant),
        PickerMode::Seeded => Arc::new(SeededPicker::new(config.seed)),
        PickerMode::Random => Arc::new(ThreadRandomPicker),
    }
}
