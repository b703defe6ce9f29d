use std::collections::HashMap;

use lumen_engine::paint::Color;
use lumen_engine::time::ClockTime;
use lumen_markup::{parse_str, Document, Node, Prop, Value};

use crate::error::SceneError;

use super::animation::{AnimatedValue, Animation, Easing, Loops};
use super::props::{value_to_color, NodeKind, NodeProps, Property};
use super::{Scene, SceneNode};

const NUMBER_ANIMATION: &str = "NumberAnimation";
const COLOR_ANIMATION: &str = "ColorAnimation";

const ANIMATION_KEYS: [&str; 8] =
    ["property", "from", "to", "duration", "delay", "loops", "easing", "alternate"];

/// Default animation length in milliseconds.
const DEFAULT_DURATION_MS: f32 = 250.0;

// ── ComponentRegistry ─────────────────────────────────────────────────────

/// Parsed component documents, looked up by alias.
///
/// A document's `import "path" as Alias` only declares the dependency; the
/// host registers the component source under the same alias beforehand.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Document>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, alias: impl Into<String>, doc: Document) {
        self.components.insert(alias.into(), doc);
    }

    /// Parses `src` and registers it under `alias`.
    pub fn parse_and_register(
        &mut self,
        alias: impl Into<String>,
        src: &str,
    ) -> Result<(), SceneError> {
        let doc = parse_str(src).map_err(|e| SceneError::compile(e.to_string()))?;
        self.components.insert(alias.into(), doc);
        Ok(())
    }

    pub fn get(&self, alias: &str) -> Option<&Document> {
        self.components.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.components.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

// ── entry points ──────────────────────────────────────────────────────────

/// Parses and compiles scene source text.
///
/// Empty (or whitespace-only) source is [`SceneError::NotFound`]; syntax
/// errors are [`SceneError::CompileFailed`] with a `line:col` prefix.
pub fn compile_source(src: &str, components: &ComponentRegistry) -> Result<Scene, SceneError> {
    if src.trim().is_empty() {
        return Err(SceneError::NotFound("scene source is empty".to_string()));
    }
    let doc = parse_str(src).map_err(|e| SceneError::compile(e.to_string()))?;
    let mut scene = compile(&doc, components)?;
    scene.set_source(src);
    Ok(scene)
}

/// Compiles a parsed document into a render tree.
///
/// A document without a root element compiles to an empty scene; callers
/// decide whether that is an error.
pub fn compile(doc: &Document, components: &ComponentRegistry) -> Result<Scene, SceneError> {
    for import in &doc.imports {
        if !components.contains(&import.alias) {
            return Err(SceneError::NotFound(format!(
                "{}:{}: component '{}' (\"{}\") is not registered",
                import.line, import.col, import.alias, import.path
            )));
        }
    }

    let mut compiler = Compiler { components, nodes: Vec::new(), expanding: Vec::new() };
    let root = match &doc.root {
        Some(node) => Some(compiler.node(node)?),
        None => None,
    };
    log::debug!("compiled scene: {} nodes", compiler.nodes.len());
    Ok(Scene::new(compiler.nodes, root))
}

// ── compiler ──────────────────────────────────────────────────────────────

struct Compiler<'a> {
    components: &'a ComponentRegistry,
    nodes: Vec<SceneNode>,
    /// Component aliases being expanded, outermost first.
    expanding: Vec<String>,
}

impl Compiler<'_> {
    fn node(&mut self, node: &Node) -> Result<usize, SceneError> {
        let Some(kind) = NodeKind::from_element(&node.element) else {
            return self.component(node);
        };

        let mut props = NodeProps::default();
        for prop in &node.props {
            let key = Property::from_key(&prop.key).ok_or_else(|| {
                SceneError::at(
                    prop.line,
                    prop.col,
                    format!("unknown property '{}' on {}", prop.key, node.element),
                )
            })?;
            if !kind.accepts(key) {
                return Err(SceneError::at(
                    prop.line,
                    prop.col,
                    format!("property '{}' is not valid on {}", prop.key, node.element),
                ));
            }
            props.set(key, &prop.value).map_err(|m| SceneError::at(prop.line, prop.col, m))?;
        }
        if node.content.is_some() {
            log::warn!("{}:{}: {} ignores inline content", node.line, node.col, node.element);
        }

        let index = self.nodes.len();
        self.nodes.push(SceneNode {
            kind,
            children: Vec::new(),
            props: NodeProps::default(),
            animations: Vec::new(),
        });

        let mut children = Vec::new();
        let mut animations = Vec::new();
        for child in &node.children {
            match child.element.as_str() {
                NUMBER_ANIMATION | COLOR_ANIMATION => {
                    animations.push(animation(child, kind, &props)?);
                }
                _ => children.push(self.node(child)?),
            }
        }

        let slot = &mut self.nodes[index];
        slot.props = props;
        slot.children = children;
        slot.animations = animations;
        Ok(index)
    }

    /// Expands a component alias: the component's root element with the
    /// instance's properties appended and its children added after the
    /// component's own.
    fn component(&mut self, node: &Node) -> Result<usize, SceneError> {
        let name = node.element.as_str();
        if name == NUMBER_ANIMATION || name == COLOR_ANIMATION {
            return Err(SceneError::at(
                node.line,
                node.col,
                format!("{name} must be a child of an element"),
            ));
        }
        let Some(doc) = self.components.get(name) else {
            return Err(SceneError::at(node.line, node.col, format!("unknown element '{name}'")));
        };
        if self.expanding.iter().any(|a| a == name) {
            return Err(SceneError::at(
                node.line,
                node.col,
                format!("component '{name}' includes itself"),
            ));
        }
        let Some(base) = &doc.root else {
            return Err(SceneError::at(
                node.line,
                node.col,
                format!("component '{name}' has no root element"),
            ));
        };

        let mut merged = base.clone();
        merged.props.extend(node.props.iter().cloned());
        merged.children.extend(node.children.iter().cloned());

        self.expanding.push(name.to_string());
        let result = self.node(&merged);
        self.expanding.pop();
        result
    }
}

fn last_prop<'n>(node: &'n Node, key: &str) -> Option<&'n Prop> {
    node.props.iter().rev().find(|p| p.key == key)
}

fn number(node: &Node, key: &str) -> Result<Option<f32>, SceneError> {
    let Some(p) = last_prop(node, key) else { return Ok(None) };
    let Some(n) = p.value.as_number() else {
        return Err(SceneError::at(
            p.line,
            p.col,
            format!("'{key}' expects a number, got {}", p.value.kind()),
        ));
    };
    if !n.is_finite() {
        return Err(SceneError::at(p.line, p.col, format!("'{key}' must be finite")));
    }
    Ok(Some(n))
}

fn millis(node: &Node, key: &str, default: f32) -> Result<ClockTime, SceneError> {
    let ms = number(node, key)?.unwrap_or(default);
    if !ms.is_finite() || ms < 0.0 {
        let (line, col) = last_prop(node, key).map_or((node.line, node.col), |p| (p.line, p.col));
        return Err(SceneError::at(line, col, format!("'{key}' must be a non-negative duration")));
    }
    Ok(ClockTime::from_nseconds((f64::from(ms) * ClockTime::MSECOND as f64) as u64))
}

fn animation(node: &Node, owner: NodeKind, base: &NodeProps) -> Result<Animation, SceneError> {
    let at = |p: &Prop, msg: String| SceneError::at(p.line, p.col, msg);
    let is_color = node.element == COLOR_ANIMATION;

    if let Some(child) = node.children.first() {
        return Err(SceneError::at(child.line, child.col, "animations cannot have children"));
    }
    if let Some(p) = node.props.iter().find(|p| !ANIMATION_KEYS.contains(&p.key.as_str())) {
        return Err(at(p, format!("unknown property '{}' on {}", p.key, node.element)));
    }

    let Some(prop) = last_prop(node, "property") else {
        return Err(SceneError::at(node.line, node.col, format!("{} needs a 'property'", node.element)));
    };
    let name = prop.value.as_text().unwrap_or_default();
    let target = Property::from_key(name)
        .filter(|p| if is_color { p.is_color() } else { p.is_number() })
        .filter(|p| owner.accepts(*p))
        .ok_or_else(|| {
            at(prop, format!("{} cannot animate '{name}' on {}", node.element, owner.element_name()))
        })?;

    let value = if is_color {
        let color = |key: &str| -> Result<Option<Color>, SceneError> {
            match last_prop(node, key) {
                None => Ok(None),
                Some(p) => value_to_color(&p.value)
                    .map(Some)
                    .ok_or_else(|| at(p, format!("'{key}' expects a color, got {}", p.value.kind()))),
            }
        };
        let Some(to) = color("to")? else {
            return Err(SceneError::at(node.line, node.col, "ColorAnimation needs a 'to' color"));
        };
        let from = color("from")?.or(base.color_of(target)).unwrap_or_default();
        AnimatedValue::Color { from, to }
    } else {
        let Some(to) = number(node, "to")? else {
            return Err(SceneError::at(node.line, node.col, "NumberAnimation needs a 'to' value"));
        };
        let from = number(node, "from")?.or(base.number(target)).unwrap_or(0.0);
        AnimatedValue::Number { from, to }
    };

    let loops = match last_prop(node, "loops") {
        None => Loops::Count(1),
        Some(p) => match &p.value {
            Value::Ident(s) if s == "infinite" => Loops::Infinite,
            Value::Number(n) if *n >= 1.0 => Loops::Count(*n as u32),
            v => return Err(at(p, format!("'loops' expects a count >= 1 or 'infinite', got {}", v.kind()))),
        },
    };

    let mut alternate = match last_prop(node, "alternate") {
        None => false,
        Some(p) => p.value.as_bool().ok_or_else(|| at(p, "'alternate' expects a boolean".into()))?,
    };
    let easing = match last_prop(node, "easing") {
        None => Easing::Linear,
        Some(p) => match p.value.as_text() {
            Some("alternate") => {
                alternate = true;
                Easing::Linear
            }
            Some(name) => Easing::from_name(name)
                .ok_or_else(|| at(p, format!("unknown easing '{name}'")))?,
            None => return Err(at(p, format!("'easing' expects a name, got {}", p.value.kind()))),
        },
    };

    Ok(Animation {
        property: target,
        value,
        duration: millis(node, "duration", DEFAULT_DURATION_MS)?,
        delay: millis(node, "delay", 0.0)?,
        loops,
        easing,
        alternate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(src: &str) -> Scene {
        compile_source(src, &ComponentRegistry::new()).unwrap()
    }

    fn compile_err(src: &str) -> String {
        match compile_source(src, &ComponentRegistry::new()) {
            Err(SceneError::CompileFailed { message }) => message,
            other => panic!("expected CompileFailed, got {other:?}"),
        }
    }

    #[test]
    fn empty_source_is_not_found() {
        let reg = ComponentRegistry::new();
        assert!(matches!(compile_source("", &reg), Err(SceneError::NotFound(_))));
        assert!(matches!(compile_source("  \n\t", &reg), Err(SceneError::NotFound(_))));
    }

    #[test]
    fn comment_only_source_has_no_root() {
        let scene = ok("// placeholder");
        assert!(scene.root().is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn records_source_text() {
        let src = "Rectangle { color: 'red' }";
        let scene = ok(src);
        assert_eq!(scene.source(), src);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn syntax_errors_carry_position() {
        assert!(compile_err("Item {\n  x: : 1 }").starts_with("2:6:"));
    }

    #[test]
    fn unknown_element_and_property() {
        assert_eq!(compile_err("Item { Label { } }"), "1:8: unknown element 'Label'");
        assert_eq!(compile_err("Item {\n  size: 3 }"), "2:3: unknown property 'size' on Item");
        assert_eq!(compile_err("Item { color: 'red' }"), "1:8: property 'color' is not valid on Item");
        assert!(compile_err("Rectangle { color: 'nope' }").contains("expects a color"));
    }

    #[test]
    fn unregistered_import_is_not_found() {
        let err = compile_source(r#"import "badge.lml" as Badge  Item { }"#, &ComponentRegistry::new())
            .unwrap_err();
        assert!(matches!(err, SceneError::NotFound(m) if m.contains("Badge")));
    }

    #[test]
    fn components_expand_with_overrides() {
        let mut reg = ComponentRegistry::new();
        reg.parse_and_register("Badge", "Rectangle { width: 10; height: 10; color: 'blue'  Circle { width: 2; height: 2 } }")
            .unwrap();
        let scene = compile_source(
            r#"import "badge.lml" as Badge
               Item { Badge { id: b; color: 'red'  Rectangle { width: 1; height: 1 } } }"#,
            &reg,
        )
        .unwrap();

        let badge = scene.find("b").unwrap();
        assert_eq!(scene.kind(badge), Ok(NodeKind::Rectangle));
        assert_eq!(scene.props(badge).unwrap().width, Some(10.0));
        assert_eq!(scene.props(badge).unwrap().color, Color::from_premul(1.0, 0.0, 0.0, 1.0));
        assert_eq!(scene.children(badge).unwrap().len(), 2);
    }

    #[test]
    fn recursive_component_fails() {
        let mut reg = ComponentRegistry::new();
        reg.parse_and_register("Loop", "Item { Loop { } }").unwrap();
        let err = compile_source("Loop { }", &reg).unwrap_err();
        assert!(matches!(err, SceneError::CompileFailed { message } if message.contains("includes itself")));
    }

    #[test]
    fn animation_defaults_and_parsing() {
        let scene = ok("Rectangle { x: 7  NumberAnimation { property: 'x'; to: 20; loops: infinite; easing: alternate } }");
        let root = scene.root().unwrap();
        let anim = &scene.nodes[0].animations[0];
        assert_eq!(anim.value, AnimatedValue::Number { from: 7.0, to: 20.0 });
        assert_eq!(anim.loops, Loops::Infinite);
        assert!(anim.alternate);
        assert_eq!(anim.duration, ClockTime::from_mseconds(250));
        assert_eq!(scene.props(root).unwrap().x, 7.0);
    }

    #[test]
    fn color_animation_parses() {
        let scene = ok("Rectangle { ColorAnimation { property: 'color'; from: 'black'; to: '#ffffff'; duration: 500; delay: 100; easing: in_out_quad } }");
        let anim = &scene.nodes[0].animations[0];
        assert_eq!(anim.property, Property::Color);
        assert_eq!(anim.easing, Easing::InOutQuad);
        assert_eq!(anim.delay, ClockTime::from_mseconds(100));
    }

    #[test]
    fn animation_errors() {
        assert!(compile_err("Rectangle { NumberAnimation { to: 1 } }").contains("needs a 'property'"));
        assert!(compile_err("Rectangle { NumberAnimation { property: 'color'; to: 1 } }").contains("cannot animate"));
        assert!(compile_err("Item { ColorAnimation { property: 'color'; to: 'red' } }").contains("cannot animate"));
        assert!(compile_err("Rectangle { NumberAnimation { property: 'x'; to: 1; duration: -5 } }").contains("non-negative"));
        assert!(compile_err("Rectangle { NumberAnimation { property: 'x'; to: 1; easing: bounce } }").contains("unknown easing"));
        assert!(compile_err("Rectangle { NumberAnimation { property: 'x'; to: 1; speed: 2 } }").contains("unknown property 'speed'"));
        assert!(compile_err("NumberAnimation { property: 'x'; to: 1 }").contains("child of an element"));

        let huge = "1".repeat(41);
        let to_inf = format!("Rectangle {{ NumberAnimation {{ property: 'width'; to: {huge} }} }}");
        assert!(compile_err(&to_inf).contains("'to' must be finite"));
        let from_inf = format!("Rectangle {{ NumberAnimation {{ property: 'x'; from: -{huge}; to: 1 }} }}");
        assert!(compile_err(&from_inf).contains("'from' must be finite"));
    }
}
