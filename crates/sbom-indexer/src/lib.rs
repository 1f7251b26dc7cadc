#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`SbomIndexerError`)
//! - [`config`]: Indexer configuration (`SbomIndexerConfig`, builder)
//! - [`types`]: Domain types (`Package`, `LayerRef`, `IndexResult`, `Sbom`, `Descriptor`)
//! - [`image`]: Image handle (`Image`, `ImageManifest`, `ImageConfig`)
//! - [`source`]: Image acquisition (`ImageSource` trait, `DirectoryImageSource`)
//! - [`layer`]: Layer identity mapping (`LayerMapping`)
//! - [`engine`]: Discovery engines (`DiscoveryEngine` trait, `CommandEngine`)
//! - [`scan`]: Concurrent engine invocation (`ScanOrchestrator`)
//! - [`normalize`]: Package canonicalization (`PackageNormalizer`)
//! - [`merge`]: Package reconciliation (`PackageMerger`, `MergePolicy`)
//! - [`reference`]: Image reference parsing (`ImageReference`)
//! - [`assemble`]: Document assembly (`SbomAssembler`)
//! - [`cache`]: Persisted document reuse (`SbomCache`, `CacheMiss`)
//! - [`vuln`]: Vulnerability enrichment (`VulnerabilityLookup` trait, `NoopLookup`)
//! - [`indexer`]: Main orchestrator (`SbomIndexer`, `SbomIndexerBuilder`)

pub mod assemble;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod indexer;
pub mod layer;
pub mod merge;
pub mod normalize;
pub mod reference;
pub mod scan;
pub mod source;
pub mod types;
pub mod vuln;

// --- Public API Re-exports ---

// Indexer (main orchestrator)
pub use indexer::{CacheStatus, ImageIndexOutcome, IndexedImage, SbomIndexer, SbomIndexerBuilder};

// Configuration
pub use config::{SbomIndexerConfig, SbomIndexerConfigBuilder};

// Error
pub use error::SbomIndexerError;

// Types
pub use types::{
    Descriptor, Distro, IndexResult, LayerRef, Package, Platform, SBOM_SCHEMA_VERSION, Sbom,
    Source, SourceImage,
};

// Image
pub use image::{Image, ImageConfig, ImageManifest};
pub use source::{AcquiredImage, DirectoryImageSource, ImageSource};

// Pipeline stages
pub use assemble::SbomAssembler;
pub use cache::{CacheLookup, CacheMiss, SbomCache};
pub use engine::{CommandEngine, DiscoveryEngine};
pub use layer::LayerMapping;
pub use merge::{MergePolicy, PackageMerger};
pub use normalize::PackageNormalizer;
pub use reference::ImageReference;
pub use scan::{ScanOrchestrator, ScanOutcome};

// Vulnerability
pub use vuln::{NoopLookup, VulnerabilityLookup};
