//! Invocation config resolution.
//!
//! A method's markers are consulted through an ordered chain of
//! [`ConfigSource`]s: the direct script marker, then meta-marked aliases,
//! then the externally registered mapping. The first source with an answer
//! supplies provider, evaluator and description.
//!
//! Timeouts follow their own rule. A positive timeout declared at the method
//! wins (the smallest one if several markers declare it). Only when the
//! method declares none does the smallest positive default visible through
//! the chain apply.

use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::invocation::InvocationConfig;
use crate::mapping::MarkerMappings;
use crate::marker::{Marker, SCRIPT_MARKER_KIND};
use crate::method::MethodDescriptor;

/// Configuration contributed by one [`ConfigSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
  pub marker_kind: String,
  pub provider: String,
  pub evaluator: String,
  pub description: String,
}

/// One place invocation config can come from.
pub trait ConfigSource: Send + Sync {
  /// Source name, for logging.
  fn name(&self) -> &'static str;

  /// Provider/evaluator config for these markers, if this source knows them.
  fn lookup(&self, markers: &[Marker]) -> Option<SourceConfig>;

  /// Timeout defaults this source holds for these markers.
  ///
  /// Timeouts declared at the method itself are not defaults and must not be
  /// returned here.
  fn default_timeouts(&self, _markers: &[Marker]) -> Vec<i64> {
    Vec::new()
  }
}

/// The built-in script marker applied directly to the method.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMarkerSource;

impl ConfigSource for DirectMarkerSource {
  fn name(&self) -> &'static str {
    "direct"
  }

  fn lookup(&self, markers: &[Marker]) -> Option<SourceConfig> {
    markers.iter().find_map(|marker| match marker {
      Marker::Script(script) => Some(SourceConfig {
        marker_kind: SCRIPT_MARKER_KIND.to_string(),
        provider: script.provider.clone(),
        evaluator: script.evaluator.clone(),
        description: script.description.clone(),
      }),
      _ => None,
    })
  }
}

/// Aliases carrying the script marker as a meta-marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaMarkerSource;

impl ConfigSource for MetaMarkerSource {
  fn name(&self) -> &'static str {
    "meta"
  }

  fn lookup(&self, markers: &[Marker]) -> Option<SourceConfig> {
    markers.iter().find_map(|marker| match marker {
      Marker::Composed { kind, meta, .. } => Some(SourceConfig {
        marker_kind: kind.clone(),
        provider: meta.provider.clone(),
        evaluator: meta.evaluator.clone(),
        description: meta.description.clone(),
      }),
      _ => None,
    })
  }

  fn default_timeouts(&self, markers: &[Marker]) -> Vec<i64> {
    markers
      .iter()
      .filter_map(|marker| match marker {
        Marker::Composed { meta, .. } => meta.timeout_ms,
        _ => None,
      })
      .collect()
  }
}

/// Custom markers registered in the external mapping.
#[derive(Debug, Clone, Default)]
pub struct MappingSource {
  mappings: Arc<MarkerMappings>,
}

impl MappingSource {
  pub fn new(mappings: Arc<MarkerMappings>) -> Self {
    Self { mappings }
  }
}

impl ConfigSource for MappingSource {
  fn name(&self) -> &'static str {
    "mapping"
  }

  fn lookup(&self, markers: &[Marker]) -> Option<SourceConfig> {
    markers.iter().find_map(|marker| match marker {
      Marker::Custom { kind, .. } => self.mappings.get(kind).map(|mapping| SourceConfig {
        marker_kind: kind.clone(),
        provider: mapping.provider.clone(),
        evaluator: mapping.evaluator.clone(),
        description: mapping.description.clone(),
      }),
      _ => None,
    })
  }

  fn default_timeouts(&self, markers: &[Marker]) -> Vec<i64> {
    markers
      .iter()
      .filter_map(|marker| match marker {
        Marker::Custom { kind, .. } => self.mappings.get(kind).and_then(|m| m.timeout_ms),
        _ => None,
      })
      .collect()
  }
}

/// Resolves method markers into an [`InvocationConfig`].
pub struct ConfigResolver {
  sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
  /// Create a resolver with the standard chain: direct, meta, mapping.
  pub fn new(mappings: MarkerMappings) -> Self {
    Self::with_sources(vec![
      Box::new(DirectMarkerSource),
      Box::new(MetaMarkerSource),
      Box::new(MappingSource::new(Arc::new(mappings))),
    ])
  }

  /// Create a resolver over a custom chain, queried in order.
  pub fn with_sources(sources: Vec<Box<dyn ConfigSource>>) -> Self {
    Self { sources }
  }

  /// Whether the method is routed to a script at all.
  ///
  /// Every marker variant declares scripting intent, so a method is scripted
  /// exactly when it carries markers. Whether those markers can be resolved
  /// is a separate question answered by [`ConfigResolver::resolve`].
  pub fn is_scripted(markers: &[Marker]) -> bool {
    !markers.is_empty()
  }

  /// Resolve the invocation config for a method.
  ///
  /// Returns `Ok(None)` for methods that are not scripted, and
  /// [`ConfigError::UnmappedMarker`] for scripted methods no source can
  /// configure.
  pub fn resolve(
    &self,
    descriptor: &MethodDescriptor,
    markers: &[Marker],
  ) -> Result<Option<InvocationConfig>, ConfigError> {
    if !Self::is_scripted(markers) {
      return Ok(None);
    }

    let found = self
      .sources
      .iter()
      .find_map(|source| source.lookup(markers).map(|config| (source.name(), config)));

    let Some((source_name, config)) = found else {
      return Err(ConfigError::UnmappedMarker {
        method: descriptor.to_string(),
        kinds: markers
          .iter()
          .map(Marker::kind)
          .collect::<Vec<_>>()
          .join(", "),
      });
    };

    let timeout_ms = self.resolve_timeout(markers);

    debug!(
      method = %descriptor,
      source = source_name,
      marker_kind = %config.marker_kind,
      provider = %config.provider,
      evaluator = %config.evaluator,
      timeout_ms = ?timeout_ms,
      "invocation config resolved"
    );

    Ok(Some(InvocationConfig {
      marker_kind: config.marker_kind,
      provider_name: config.provider,
      evaluator_name: config.evaluator,
      timeout_ms,
      description: config.description,
    }))
  }

  fn resolve_timeout(&self, markers: &[Marker]) -> Option<u64> {
    let declared = markers
      .iter()
      .filter_map(Marker::declared_timeout)
      .filter(|t| *t > 0)
      .min();

    declared
      .or_else(|| {
        self
          .sources
          .iter()
          .flat_map(|source| source.default_timeouts(markers))
          .filter(|t| *t > 0)
          .min()
      })
      .and_then(|t| u64::try_from(t).ok())
  }
}

impl Default for ConfigResolver {
  fn default() -> Self {
    Self::new(MarkerMappings::new())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mapping::MarkerMapping;
  use crate::marker::ScriptMarker;

  fn descriptor() -> MethodDescriptor {
    MethodDescriptor::new("TimeoutRepository", "doLongJob", vec!["i64".to_string()])
  }

  fn resolver() -> ConfigResolver {
    let mappings = [
      MarkerMapping::new("XmlScript", "xml-provider", "xml-evaluator").with_timeout(500),
      MarkerMapping::new("Untimed", "xml-provider", "xml-evaluator"),
    ]
    .into_iter()
    .collect();
    ConfigResolver::new(mappings)
  }

  #[test]
  fn test_no_markers_is_not_scripted() {
    let config = resolver().resolve(&descriptor(), &[]).unwrap();
    assert!(config.is_none());
  }

  #[test]
  fn test_direct_marker() {
    let markers = [Marker::Script(
      ScriptMarker::new("db-provider", "groovy")
        .with_timeout(1_000)
        .with_description("tax calculation"),
    )];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.marker_kind, SCRIPT_MARKER_KIND);
    assert_eq!(config.provider_name, "db-provider");
    assert_eq!(config.evaluator_name, "groovy");
    assert_eq!(config.timeout_ms, Some(1_000));
    assert_eq!(config.description, "tax calculation");
  }

  #[test]
  fn test_composed_marker_uses_meta_config() {
    let markers = [Marker::composed("GroovyScript", ScriptMarker::default())];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.marker_kind, "GroovyScript");
    assert_eq!(config.provider_name, crate::DEFAULT_PROVIDER);
    assert_eq!(config.timeout_ms, None);
  }

  #[test]
  fn test_meta_default_timeout_applies_when_method_declares_none() {
    let markers = [Marker::composed(
      "ComposedTimeout",
      ScriptMarker::default().with_timeout(100),
    )];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.timeout_ms, Some(100));
  }

  #[test]
  fn test_declared_timeout_prevails_over_smaller_meta_default() {
    let markers = [
      Marker::composed("ComposedTimeout", ScriptMarker::default().with_timeout(100))
        .with_timeout(1_000),
    ];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.timeout_ms, Some(1_000));
  }

  #[test]
  fn test_non_positive_declared_timeout_falls_back() {
    let markers = [
      Marker::composed("ComposedTimeout", ScriptMarker::default().with_timeout(100))
        .with_timeout(-1),
    ];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.timeout_ms, Some(100));
  }

  #[test]
  fn test_smallest_default_when_several_remain() {
    let markers = [
      Marker::composed("ComposedTimeout", ScriptMarker::default().with_timeout(800)),
      Marker::custom("XmlScript"),
    ];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.marker_kind, "ComposedTimeout");
    assert_eq!(config.timeout_ms, Some(500));
  }

  #[test]
  fn test_mapped_custom_marker() {
    let markers = [Marker::custom("XmlScript")];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.marker_kind, "XmlScript");
    assert_eq!(config.provider_name, "xml-provider");
    assert_eq!(config.evaluator_name, "xml-evaluator");
    assert_eq!(config.timeout_ms, Some(500));
  }

  #[test]
  fn test_mapped_custom_marker_without_timeout_is_unbounded() {
    let markers = [Marker::custom("Untimed")];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.timeout_ms, None);
  }

  #[test]
  fn test_direct_marker_takes_priority_over_mapping() {
    let markers = [
      Marker::custom("XmlScript"),
      Marker::Script(ScriptMarker::new("direct-provider", "direct-evaluator")),
    ];

    let config = resolver().resolve(&descriptor(), &markers).unwrap().unwrap();
    assert_eq!(config.provider_name, "direct-provider");
    // The mapping still contributes its default timeout.
    assert_eq!(config.timeout_ms, Some(500));
  }

  #[test]
  fn test_unmapped_custom_marker_fails() {
    let markers = [Marker::custom("UnknownScript")];

    let err = resolver().resolve(&descriptor(), &markers).unwrap_err();
    match err {
      ConfigError::UnmappedMarker { method, kinds } => {
        assert_eq!(method, "TimeoutRepository.doLongJob(i64)");
        assert_eq!(kinds, "UnknownScript");
      }
      other => panic!("expected UnmappedMarker, got {:?}", other),
    }
  }

  #[test]
  fn test_custom_source_chain() {
    struct Fixed;

    impl ConfigSource for Fixed {
      fn name(&self) -> &'static str {
        "fixed"
      }

      fn lookup(&self, _markers: &[Marker]) -> Option<SourceConfig> {
        Some(SourceConfig {
          marker_kind: "fixed".to_string(),
          provider: "p".to_string(),
          evaluator: "e".to_string(),
          description: String::new(),
        })
      }

      fn default_timeouts(&self, _markers: &[Marker]) -> Vec<i64> {
        vec![0, 42]
      }
    }

    let resolver = ConfigResolver::with_sources(vec![Box::new(Fixed)]);
    let config = resolver
      .resolve(&descriptor(), &[Marker::custom("anything")])
      .unwrap()
      .unwrap();
    assert_eq!(config.provider_name, "p");
    assert_eq!(config.timeout_ms, Some(42));
  }
}
