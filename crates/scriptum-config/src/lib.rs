//! Scriptum Config
//!
//! This crate contains the declaration types for script repositories: the
//! methods an interface exposes, the markers that route those methods to
//! scripts, and the externally registered marker mappings. It also owns the
//! configuration resolver, which turns a method's markers into a single
//! [`InvocationConfig`].
//!
//! Declarations can be built in code or loaded from JSON manifests
//! (see [`RepositoryDef::from_json`]).

mod error;
mod invocation;
mod mapping;
mod marker;
mod method;
mod repository;
mod resolver;

pub use error::ConfigError;
pub use invocation::InvocationConfig;
pub use mapping::{MarkerMapping, MarkerMappings};
pub use marker::{DEFAULT_EVALUATOR, DEFAULT_PROVIDER, Marker, SCRIPT_MARKER_KIND, ScriptMarker};
pub use method::{MethodDef, MethodDescriptor, ParamDef, ReturnKind};
pub use repository::{InterfaceDef, RepositoryDef};
pub use resolver::{
  ConfigResolver, ConfigSource, DirectMarkerSource, MappingSource, MetaMarkerSource, SourceConfig,
};
