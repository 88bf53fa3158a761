//! filterpolicy Core Library
//!
//! This crate provides the category matching engine of the filterpolicy
//! content filter. Given a request (URL, host, headers) or a block of text it
//! reports which configured filter categories apply.
//!
//! # Architecture
//!
//! Configured lists are loaded into a [`Generation`]: a category registry, a
//! category-sharded rule matcher and a text-trigger trie. A generation is
//! built once per configuration, frozen, and published through
//! [`PolicyEngine`], which swaps generations atomically while queries keep
//! running lock-free against whichever generation they loaded.
//!
//! Rule syntax is not interpreted here. Rule lines are handed to a
//! [`RuleParser`] supplied by the host application.
//!
//! # Modules
//!
//! - `separator`: Word-separator classification
//! - `trie`: Text-trigger trie with separator-equivalent edges
//! - `registry`: List name to category id mapping
//! - `rule`: Rule parsing and matching capability traits
//! - `matcher`: Category-sharded rule matcher
//! - `config`: Policy configuration model
//! - `bundle`: Server list bundle splitter
//! - `generation`: Generation builder and list sources
//! - `engine`: Hot-swapping filtering facade
//! - `types`: Shared type definitions

pub mod bundle;
pub mod config;
pub mod engine;
pub mod generation;
pub mod matcher;
pub mod registry;
pub mod rule;
pub mod separator;
pub mod trie;
pub mod types;

// Re-export commonly used types
pub use bundle::{BundledList, ListBundle};
pub use config::{BuildOptions, ConfigError, ListConfig, PolicyConfig};
pub use engine::PolicyEngine;
pub use generation::{BuildError, DirectoryListSource, Generation, GenerationBuilder, ListSource, LoadStats};
pub use matcher::{LoadCounts, MatcherError, ShardedMatcher};
pub use registry::{CategoryRegistry, RegistryError};
pub use rule::{FilterRule, RuleMatchError, RuleParseError, RuleParser};
pub use separator::is_separator;
pub use trie::TriggerTree;
pub use types::{Category, CategoryId, HeaderMap, ListType, MatchedCategory, Request};
