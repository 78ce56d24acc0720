//! Composite expansion.
//!
//! Rewrites a field's directive tree into a flat list of primitives:
//! composite attribute values are pushed into their components through the
//! override links, then components are expanded in place.

use serde_json::Value;

use crate::directive::{
    AttrSpec, CompositeDefinition, CompositeDirective, Directive, DirectiveCatalog, DirectiveNode,
};
use crate::error::ConfigError;

/// Flattens composite directives against a catalog.
pub struct CompositeExpander<'a> {
    catalog: &'a DirectiveCatalog,
    max_depth: usize,
}

impl<'a> CompositeExpander<'a> {
    pub fn new(catalog: &'a DirectiveCatalog, max_depth: usize) -> Self {
        Self { catalog, max_depth }
    }

    /// Resolve a directive list. Primitive-only input comes back unchanged.
    pub fn expand(&self, nodes: &[DirectiveNode]) -> Result<Vec<Directive>, ConfigError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.expand_node(node, 0, &mut out)?;
        }
        Ok(out)
    }

    fn expand_node(
        &self,
        node: &DirectiveNode,
        depth: usize,
        out: &mut Vec<Directive>,
    ) -> Result<(), ConfigError> {
        match node {
            DirectiveNode::Primitive(d) => {
                out.push(d.clone());
                Ok(())
            }
            DirectiveNode::Composite(c) => self.expand_composite(c, depth, out),
        }
    }

    fn expand_composite(
        &self,
        composite: &CompositeDirective,
        depth: usize,
        out: &mut Vec<Directive>,
    ) -> Result<(), ConfigError> {
        if depth >= self.max_depth {
            return Err(ConfigError::ExpansionTooDeep {
                kind: composite.kind.clone(),
                limit: self.max_depth,
            });
        }
        let definition = self
            .catalog
            .composite(&composite.kind)
            .ok_or_else(|| ConfigError::UnregisteredKind(composite.kind.clone()))?;

        if let Some(unknown) = composite
            .attrs
            .keys()
            .find(|k| definition.attribute_spec(k).is_none())
        {
            return Err(ConfigError::UnknownAttribute {
                kind: composite.kind.clone(),
                attribute: unknown.clone(),
            });
        }

        let mut components = definition.components.clone();
        for link in &definition.overrides {
            let value = composite_value(composite, definition, &link.source)?;
            let component = components.get_mut(link.component).ok_or_else(|| {
                ConfigError::UnknownOverrideComponent {
                    composite: composite.kind.clone(),
                    index: link.component,
                }
            })?;
            let target = self.target_spec(component, &link.target).ok_or_else(|| {
                ConfigError::UnknownOverrideTarget {
                    composite: composite.kind.clone(),
                    component: component.kind().clone(),
                    target: link.target.clone(),
                }
            })?;
            if !target.ty.accepts(&value) {
                return Err(ConfigError::IncompatibleOverride {
                    composite: composite.kind.clone(),
                    attribute: link.source.clone(),
                    component: component.kind().clone(),
                    target: link.target.clone(),
                    expected: target.ty.name().to_string(),
                });
            }
            component.set_attr(&link.target, value);
        }

        for mut component in components {
            if propagate(composite, &mut component) {
                self.expand_node(&component, depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// Attribute schema of a component's target attribute.
    fn target_spec(&self, component: &DirectiveNode, target: &str) -> Option<AttrSpec> {
        match component {
            DirectiveNode::Primitive(d) => self.catalog.spec(d.kind())?.attr_spec(target).cloned(),
            DirectiveNode::Composite(c) => self
                .catalog
                .composite(c.kind())?
                .attribute_spec(target)
                .cloned(),
        }
    }
}

/// Value supplied on the composite, or its declared default.
fn composite_value(
    composite: &CompositeDirective,
    definition: &CompositeDefinition,
    name: &str,
) -> Result<Value, ConfigError> {
    let supplied = composite.attrs.get(name).filter(|v| !v.is_null());
    let default = definition
        .attribute_spec(name)
        .and_then(|spec| spec.default.as_ref())
        .filter(|v| !v.is_null());
    supplied
        .or(default)
        .cloned()
        .ok_or_else(|| ConfigError::MissingAttribute {
            kind: composite.kind.clone(),
            attribute: name.to_string(),
        })
}

/// Push the composite's groups, cases and message into a component.
///
/// Returns false when the component no longer applies to any case.
fn propagate(composite: &CompositeDirective, component: &mut DirectiveNode) -> bool {
    let (cases, groups, message) = match component {
        DirectiveNode::Primitive(d) => (&mut d.cases, &mut d.groups, &mut d.message),
        DirectiveNode::Composite(c) => (&mut c.cases, &mut c.groups, &mut c.message),
    };

    if !composite.groups.is_empty() {
        *groups = composite.groups.clone();
    }
    if !composite.cases.is_empty() {
        if cases.is_empty() {
            *cases = composite.cases.clone();
        } else {
            cases.retain(|c| composite.cases.contains(c));
            if cases.is_empty() {
                return false;
            }
        }
    }
    if message.is_none() {
        message.clone_from(&composite.message);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{kinds, AttrType, BuildCase, CompositeDefinition, Group, KindId};
    use serde_json::json;

    fn expand(
        catalog: &DirectiveCatalog,
        nodes: Vec<DirectiveNode>,
    ) -> Result<Vec<Directive>, ConfigError> {
        CompositeExpander::new(catalog, 8).expand(&nodes)
    }

    #[test]
    fn test_primitive_list_is_identity() {
        let catalog = DirectiveCatalog::standard();
        let nodes: Vec<DirectiveNode> = vec![kinds::trim().into(), kinds::length_max(4).into()];
        let out = expand(&catalog, nodes).unwrap();
        assert_eq!(out, vec![kinds::trim(), kinds::length_max(4)]);
    }

    #[test]
    fn test_fixed_size_overrides() {
        let catalog = DirectiveCatalog::standard();
        let fixed = kinds::fixed_size(10).with_attr("pad_char", "_");
        let out = expand(&catalog, vec![fixed.into()]).unwrap();

        assert_eq!(out.len(), 2);
        let pad = &out[0];
        assert_eq!(pad.kind(), &kinds::MULTI_PAD);
        assert_eq!(pad.order(), 1000);
        assert_eq!(pad.attr("size"), Some(&json!(10)));
        assert_eq!(pad.attr("pad_char"), Some(&json!("_")));
        assert_eq!(pad.attr("right_align"), Some(&json!(false)));
        assert!(pad.applies_to(BuildCase::Write) && !pad.applies_to(BuildCase::Read));

        let trim = &out[1];
        assert_eq!(trim.kind(), &kinds::ONE_SIDE_TRIM);
        assert_eq!(trim.attr("trim_char"), Some(&json!("_")));
        assert_eq!(trim.attr("left_align"), Some(&json!(false)));
    }

    #[test]
    fn test_missing_composite_attribute() {
        let catalog = DirectiveCatalog::standard();
        let fixed = CompositeDirective::new(kinds::FIXED_SIZE);
        let err = expand(&catalog, vec![fixed.into()]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingAttribute { kind: kinds::FIXED_SIZE, attribute: "size".into() }
        );
    }

    #[test]
    fn test_unknown_override_target() {
        let mut catalog = DirectiveCatalog::standard();
        let kind = KindId::new("app::Broken");
        catalog
            .register_composite(
                CompositeDefinition::new(kind.clone())
                    .attribute(AttrSpec::with_default("width", AttrType::Integer, 3))
                    .component(kinds::trim())
                    .link("width", 0, "width"),
            )
            .unwrap();
        let err = expand(&catalog, vec![CompositeDirective::new(kind).into()]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownOverrideTarget { ref target, .. } if target == "width"
        ));
    }

    #[test]
    fn test_incompatible_override() {
        let catalog = DirectiveCatalog::standard();
        let fixed = kinds::fixed_size(10).with_attr("pad_char", 5);
        let err = expand(&catalog, vec![fixed.into()]).unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleOverride { .. }));
    }

    #[test]
    fn test_composite_case_groups_and_message_propagate() {
        let catalog = DirectiveCatalog::standard();
        let fixed = kinds::fixed_size(4)
            .on(BuildCase::Read)
            .in_group("import")
            .with_message("bad width");
        let out = expand(&catalog, vec![fixed.into()]).unwrap();

        // the write-only MultiPad has an empty intersection with {Read}
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), &kinds::ONE_SIDE_TRIM);
        assert!(out[0].groups().contains(&Group::from("import")));
        assert_eq!(out[0].message(), Some("bad width"));
    }

    #[test]
    fn test_nested_composites_and_depth_limit() {
        let mut catalog = DirectiveCatalog::standard();
        let outer = KindId::new("app::Code");
        catalog
            .register_composite(
                CompositeDefinition::new(outer.clone())
                    .attribute(AttrSpec::required("width", AttrType::Integer))
                    .component(kinds::trim())
                    .component(kinds::fixed_size(1))
                    .link("width", 1, "size"),
            )
            .unwrap();

        let node: DirectiveNode =
            CompositeDirective::new(outer.clone()).with_attr("width", 6).into();
        let out = expand(&catalog, vec![node.clone()]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].attr("size"), Some(&json!(6)));

        let shallow = CompositeExpander::new(&catalog, 1).expand(&[node]);
        assert_eq!(
            shallow,
            Err(ConfigError::ExpansionTooDeep { kind: kinds::FIXED_SIZE, limit: 1 })
        );
    }

    #[test]
    fn test_self_referencing_composite_stops() {
        let mut catalog = DirectiveCatalog::standard();
        let kind = KindId::new("app::Loop");
        catalog
            .register_composite(
                CompositeDefinition::new(kind.clone())
                    .component(CompositeDirective::new(kind.clone())),
            )
            .unwrap();
        let err = expand(&catalog, vec![CompositeDirective::new(kind).into()]).unwrap_err();
        assert!(matches!(err, ConfigError::ExpansionTooDeep { limit: 8, .. }));
    }
}
