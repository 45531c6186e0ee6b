//! Flattening of declared bundle dependencies into an ordered, cycle-checked list.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::{BundleError, Result};

/// Dependency declaration of one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
  /// Bundle name.
  pub name: String,
  /// Global bundles can't declare dependencies and are never listed as one.
  pub global: bool,
  /// Declared dependency names, in order.
  pub dependencies: Vec<String>,
}

impl DependencyNode {
  /// Create a node.
  pub fn new(name: impl Into<String>, global: bool, dependencies: Vec<String>) -> Self {
    Self {
      name: name.into(),
      global,
      dependencies,
    }
  }
}

/// Resolves dependency names depth-first, dependencies before their dependents.
#[derive(Debug)]
pub struct DependencyResolver<'a> {
  nodes: BTreeMap<&'a str, &'a DependencyNode>,
}

impl<'a> DependencyResolver<'a> {
  /// Resolver over every known bundle.
  pub fn new(nodes: impl IntoIterator<Item = &'a DependencyNode>) -> Self {
    Self {
      nodes: nodes
        .into_iter()
        .map(|node| (node.name.as_str(), node))
        .collect(),
    }
  }

  /// Ordered dependency names of `root`.
  pub fn resolve(&self, root: &str) -> Result<Vec<String>> {
    let node = self
      .nodes
      .get(root)
      .copied()
      .ok_or_else(|| BundleError::UnknownBundle(root.to_string()))?;

    if node.global && !node.dependencies.is_empty() {
      return Err(BundleError::dependency(
        root,
        "a global bundle can't have dependencies; use the inclusion order to sort global bundles",
      ));
    }

    let mut walk = Walk {
      root,
      resolved: Vec::new(),
      processing: vec![root],
    };
    walk.visit(self, node)?;
    Ok(walk.resolved)
  }

  /// Resolve every known bundle, keyed by name.
  pub fn resolve_all(&self) -> Result<BTreeMap<String, Vec<String>>> {
    self
      .nodes
      .keys()
      .map(|name| Ok((name.to_string(), self.resolve(name)?)))
      .collect()
  }
}

struct Walk<'r> {
  root: &'r str,
  resolved: Vec<String>,
  processing: Vec<&'r str>,
}

impl<'r> Walk<'r> {
  fn visit(&mut self, resolver: &DependencyResolver<'r>, node: &'r DependencyNode) -> Result<()> {
    for name in &node.dependencies {
      let Some(dependency) = resolver.nodes.get(name.as_str()).copied() else {
        return Err(BundleError::dependency(
          self.root,
          format!("bundle '{}' depends on the unknown bundle '{name}'", node.name),
        ));
      };

      if self.resolved.iter().any(|done| done == name) {
        info!(
          bundle = self.root,
          dependency = %name,
          "dependency already resolved, skipping"
        );
        continue;
      }

      if self.processing.contains(&name.as_str()) {
        return Err(BundleError::dependency(
          self.root,
          format!("circular dependency on bundle '{name}'"),
        ));
      }

      if dependency.global {
        info!(
          bundle = self.root,
          dependency = %name,
          "global bundles are always included, dropping dependency"
        );
        continue;
      }

      self.processing.push(dependency.name.as_str());
      self.visit(resolver, dependency)?;
      self.processing.pop();
      self.resolved.push(dependency.name.clone());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(name: &str, global: bool, deps: &[&str]) -> DependencyNode {
    DependencyNode::new(name, global, deps.iter().map(|d| d.to_string()).collect())
  }

  #[test]
  fn dependencies_precede_dependents() {
    let nodes = vec![
      node("app", false, &["widgets", "core"]),
      node("widgets", false, &["core", "dom"]),
      node("core", false, &[]),
      node("dom", false, &["core"]),
    ];
    let resolver = DependencyResolver::new(&nodes);

    let order = resolver.resolve("app").unwrap();
    assert_eq!(order, vec!["core", "dom", "widgets"]);
    assert_eq!(resolver.resolve("app").unwrap(), order);
  }

  #[test]
  fn circular_dependencies_name_the_bundle() {
    let nodes = vec![node("a", false, &["b"]), node("b", false, &["a"])];
    let err = DependencyResolver::new(&nodes).resolve("a").unwrap_err();
    match err {
      BundleError::Dependency { bundle, reason } => {
        assert_eq!(bundle, "a");
        assert!(reason.contains("'a'"));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn global_bundles_are_dropped_and_cannot_declare_dependencies() {
    let nodes = vec![
      node("app", false, &["jquery", "core"]),
      node("jquery", true, &[]),
      node("core", false, &[]),
      node("bad", true, &["core"]),
    ];
    let resolver = DependencyResolver::new(&nodes);

    assert_eq!(resolver.resolve("app").unwrap(), vec!["core"]);
    assert!(matches!(
      resolver.resolve("bad"),
      Err(BundleError::Dependency { bundle, .. }) if bundle == "bad"
    ));
  }

  #[test]
  fn unknown_dependencies_fail() {
    let nodes = vec![node("app", false, &["missing"])];
    assert!(DependencyResolver::new(&nodes).resolve("app").is_err());
  }
}
