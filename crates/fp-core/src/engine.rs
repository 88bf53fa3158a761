//! Filtering facade
//!
//! `PolicyEngine` owns the currently published [`Generation`] and swaps in
//! new ones. Queries load the current generation without locking; rebuilds
//! are serialised and only publish once a build has completed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::{BuildOptions, PolicyConfig};
use crate::generation::{BuildError, Generation, GenerationBuilder, ListSource};
use crate::rule::RuleParser;
use crate::types::{MatchedCategory, Request};

/// Hot-swappable policy engine.
pub struct PolicyEngine<P: RuleParser> {
    parser: P,
    options: BuildOptions,
    current: ArcSwap<Generation<P::Rule>>,
    rebuild_lock: Mutex<()>,
    last_number: AtomicU64,
    bypass_enabled: AtomicBool,
}

impl<P: RuleParser> PolicyEngine<P> {
    /// Create an engine serving an empty generation.
    pub fn new(parser: P, options: BuildOptions) -> Self {
        Self {
            parser,
            options,
            current: ArcSwap::new(Arc::new(Generation::empty())),
            rebuild_lock: Mutex::new(()),
            last_number: AtomicU64::new(0),
            bypass_enabled: AtomicBool::new(false),
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// The generation queries currently run against.
    pub fn current(&self) -> Arc<Generation<P::Rule>> {
        self.current.load_full()
    }

    /// Start a build seeded with the current registry.
    pub fn builder(&self) -> GenerationBuilder<'_, P> {
        let current = self.current.load();
        GenerationBuilder::seeded(&self.parser, self.options.clone(), current.registry())
    }

    /// Build a generation from `config` and publish it.
    ///
    /// On error nothing is published and the previous generation keeps
    /// serving queries.
    pub fn rebuild<S>(&self, config: &PolicyConfig, source: &S) -> Result<Arc<Generation<P::Rule>>, BuildError>
    where
        S: ListSource + ?Sized,
    {
        let _guard = self.rebuild_lock.lock();

        let mut builder = self.builder();
        if let Err(e) = builder.load_config(config, source) {
            log::warn!("Rebuild failed, keeping generation {}: {}", self.current.load().number(), e);
            return Err(e);
        }
        let generation = match builder.finish() {
            Ok(generation) => generation,
            Err(e) => {
                log::warn!("Rebuild failed, keeping generation {}: {}", self.current.load().number(), e);
                return Err(e);
            }
        };

        Ok(self.publish(generation))
    }

    /// Publish a generation built elsewhere.
    pub fn install(&self, generation: Generation<P::Rule>) -> Arc<Generation<P::Rule>> {
        let _guard = self.rebuild_lock.lock();
        self.publish(generation)
    }

    fn publish(&self, mut generation: Generation<P::Rule>) -> Arc<Generation<P::Rule>> {
        generation.number = self.last_number.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::new(generation);
        self.current.store(Arc::clone(&generation));

        let stats = generation.stats();
        log::info!(
            "Installed generation {} ({} categories, {} rules, {} triggers)",
            generation.number(),
            stats.categories,
            stats.rules_loaded,
            stats.triggers_loaded
        );
        generation
    }

    pub fn bypass_enabled(&self) -> bool {
        self.bypass_enabled.load(Ordering::Relaxed)
    }

    /// When enabled, bypass categories are never reported.
    pub fn set_bypass_enabled(&self, enabled: bool) {
        self.bypass_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Categories matching a request.
    pub fn test_url(&self, request: &Request<'_>) -> Vec<MatchedCategory> {
        self.current.load().test_url(request, self.bypass_enabled())
    }

    /// Categories of the first trigger phrase found in `text`.
    pub fn test_text(&self, text: &str) -> Vec<MatchedCategory> {
        self.current.load().test_text(text)
    }
}

impl<P: RuleParser> std::fmt::Debug for PolicyEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.load();
        f.debug_struct("PolicyEngine")
            .field("generation", &current.number())
            .field("stats", current.stats())
            .field("bypass_enabled", &self.bypass_enabled())
            .finish()
    }
}
