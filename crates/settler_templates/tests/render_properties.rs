//! Property tests for placeholder substitution.

use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::sample::Index;

use settler_templates::{RenderOptions, TemplateRenderer, VariableMap};

/// Literal text that never forms or touches a delimiter.
const LITERAL: &str = "[a-z0-9 ;=$'\"(),.\n\t-]{0,12}";

/// A piece of template: literal text, then a placeholder for one of the
/// generated identifiers in either syntax.
type Segment = (String, Index, bool);

fn identifier() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,8}"
}

fn segments() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec((LITERAL, any::<Index>(), any::<bool>()), 1..8)
}

fn token(name: &str, braces: bool) -> String {
    if braces {
        format!("{{{{ {} }}}}", name)
    } else {
        format!("__replace_this_{}_value__", name)
    }
}

/// Values that look like template syntax, complete or not.
fn placeholder_like() -> impl Strategy<Value = String> {
    prop_oneof![
        identifier().prop_map(|n| token(&n, true)),
        identifier().prop_map(|n| token(&n, false)),
        identifier().prop_map(|n| format!("{{{{ {}", n)),
        identifier().prop_map(|n| format!("__replace_this_{}", n)),
        "\\PC{0,16}",
    ]
}

/// Template built from `segments`, and the output a correct render of it
/// must produce.
fn build(segments: &[Segment], values: &BTreeMap<String, String>) -> (String, String) {
    let names: Vec<&String> = values.keys().collect();
    let mut template = String::new();
    let mut expected = String::new();
    for (literal, pick, braces) in segments {
        let name = names[pick.index(names.len())];
        template.push_str(literal);
        template.push_str(&token(name, *braces));
        expected.push_str(literal);
        expected.push_str(&values[name]);
    }
    (template, expected)
}

fn variables(values: &BTreeMap<String, String>) -> VariableMap {
    VariableMap::from_pairs(values.iter().map(|(k, v)| (k.clone(), v.clone())))
}

proptest! {
    /// Text without placeholders comes back unchanged in both modes.
    #[test]
    fn test_placeholder_free_text_unchanged(
        text in "[a-zA-Z0-9 ;=$'\"(),.}_\n\t-]{0,200}",
        values in prop::collection::btree_map(identifier(), "\\PC{0,16}", 0..4),
    ) {
        let renderer = TemplateRenderer::new();
        let vars = variables(&values);

        for options in [RenderOptions::default(), RenderOptions::strict()] {
            let result = renderer.render(&text, &vars, &options).unwrap();
            prop_assert_eq!(&result.output, &text);
            prop_assert_eq!(result.substitutions, 0);
        }
    }

    /// Every resolved placeholder is replaced by exactly its value.
    #[test]
    fn test_values_appear_verbatim(
        values in prop::collection::btree_map(identifier(), "\\PC{0,24}", 1..5),
        segments in segments(),
        tail in LITERAL,
    ) {
        let (mut template, mut expected) = build(&segments, &values);
        template.push_str(&tail);
        expected.push_str(&tail);

        let renderer = TemplateRenderer::new();
        let result = renderer
            .render(&template, &variables(&values), &RenderOptions::strict())
            .unwrap();

        prop_assert_eq!(&result.output, &expected);
        prop_assert_eq!(result.substitutions, segments.len());
        prop_assert!(result.is_complete());
    }

    /// Values that look like placeholders of defined variables stay literal.
    #[test]
    fn test_values_are_never_rescanned(
        values in prop::collection::btree_map(identifier(), placeholder_like(), 1..5),
        segments in segments(),
    ) {
        let (template, expected) = build(&segments, &values);

        let renderer = TemplateRenderer::new();
        let result = renderer
            .render(&template, &variables(&values), &RenderOptions::default())
            .unwrap();

        prop_assert_eq!(&result.output, &expected);
        prop_assert_eq!(result.substitutions, segments.len());
    }

    /// Rendering a fully resolved output again is a fixed point.
    #[test]
    fn test_render_of_resolved_output_is_fixed_point(
        values in prop::collection::btree_map(identifier(), LITERAL, 1..5),
        segments in segments(),
    ) {
        let (template, _) = build(&segments, &values);
        let vars = variables(&values);

        let renderer = TemplateRenderer::new();
        let once = renderer.render_content(&template, &vars).unwrap();
        prop_assert!(renderer.extract_placeholders(&once).unwrap().is_empty());

        let twice = renderer.render(&once, &vars, &RenderOptions::strict()).unwrap();
        prop_assert_eq!(twice.output, once);
        prop_assert_eq!(twice.substitutions, 0);
    }
}
