use lumen_engine::paint::Color;
use lumen_markup::Value;
use lumen_markup::lexer::parse_hex_color;

/// Built-in element types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Invisible container.
    Item,
    Rectangle,
    /// Disc inscribed in the node's box.
    Circle,
    /// Samples the current input frame.
    Video,
}

impl NodeKind {
    pub fn from_element(name: &str) -> Option<Self> {
        match name {
            "Item" => Some(NodeKind::Item),
            "Rectangle" => Some(NodeKind::Rectangle),
            "Circle" => Some(NodeKind::Circle),
            "VideoItem" => Some(NodeKind::Video),
            _ => None,
        }
    }

    pub fn element_name(self) -> &'static str {
        match self {
            NodeKind::Item => "Item",
            NodeKind::Rectangle => "Rectangle",
            NodeKind::Circle => "Circle",
            NodeKind::Video => "VideoItem",
        }
    }

    pub fn accepts(self, prop: Property) -> bool {
        match prop {
            Property::Radius => self == NodeKind::Rectangle,
            Property::Color | Property::BorderWidth | Property::BorderColor => {
                matches!(self, NodeKind::Rectangle | NodeKind::Circle)
            }
            _ => true,
        }
    }
}

/// Settable node properties.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Property {
    Id,
    X,
    Y,
    Width,
    Height,
    Z,
    Opacity,
    Visible,
    Clip,
    Fill,
    Color,
    Radius,
    BorderWidth,
    BorderColor,
}

impl Property {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "id" => Property::Id,
            "x" => Property::X,
            "y" => Property::Y,
            "width" => Property::Width,
            "height" => Property::Height,
            "z" => Property::Z,
            "opacity" => Property::Opacity,
            "visible" => Property::Visible,
            "clip" => Property::Clip,
            "fill" => Property::Fill,
            "color" => Property::Color,
            "radius" => Property::Radius,
            "border_width" => Property::BorderWidth,
            "border_color" => Property::BorderColor,
            _ => return None,
        })
    }

    pub fn key(self) -> &'static str {
        match self {
            Property::Id => "id",
            Property::X => "x",
            Property::Y => "y",
            Property::Width => "width",
            Property::Height => "height",
            Property::Z => "z",
            Property::Opacity => "opacity",
            Property::Visible => "visible",
            Property::Clip => "clip",
            Property::Fill => "fill",
            Property::Color => "color",
            Property::Radius => "radius",
            Property::BorderWidth => "border_width",
            Property::BorderColor => "border_color",
        }
    }

    /// Properties a `NumberAnimation` may drive.
    pub fn is_number(self) -> bool {
        matches!(
            self,
            Property::X
                | Property::Y
                | Property::Width
                | Property::Height
                | Property::Opacity
                | Property::Radius
                | Property::BorderWidth
        )
    }

    /// Properties a `ColorAnimation` may drive.
    pub fn is_color(self) -> bool {
        matches!(self, Property::Color | Property::BorderColor)
    }
}

/// Reads a color from a hex literal, a quoted hex string, or a color name.
pub fn value_to_color(value: &Value) -> Option<Color> {
    match value {
        Value::Color(rgba) => Some(Color::from_rgba8(*rgba)),
        Value::Str(s) | Value::Ident(s) => match s.strip_prefix('#') {
            Some(hex) => parse_hex_color(hex).map(Color::from_rgba8),
            None => Color::from_name(s),
        },
        Value::Number(_) => None,
    }
}

/// Base (un-animated) property values of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeProps {
    pub id: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub z: i32,
    pub opacity: f32,
    pub visible: bool,
    pub clip: bool,
    pub fill_parent: bool,
    pub color: Color,
    pub radius: f32,
    pub border_width: f32,
    pub border_color: Color,
}

impl Default for NodeProps {
    fn default() -> Self {
        Self {
            id: None,
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            z: 0,
            opacity: 1.0,
            visible: true,
            clip: false,
            fill_parent: false,
            color: Color::from_premul(1.0, 1.0, 1.0, 1.0),
            radius: 0.0,
            border_width: 0.0,
            border_color: Color::from_premul(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl NodeProps {
    /// Assigns `value` to `prop`; the error names the expected type.
    pub fn set(&mut self, prop: Property, value: &Value) -> Result<(), String> {
        let expected = |what: &str| {
            format!("property '{}' expects {what}, got {}", prop.key(), value.kind())
        };

        match prop {
            Property::Id => {
                let (Value::Ident(id) | Value::Str(id)) = value else {
                    return Err(expected("an identifier"));
                };
                self.id = Some(id.clone());
            }
            Property::Visible | Property::Clip => {
                let b = value.as_bool().ok_or_else(|| expected("a boolean"))?;
                if prop == Property::Visible {
                    self.visible = b;
                } else {
                    self.clip = b;
                }
            }
            Property::Fill => match value.as_text() {
                Some("parent") => self.fill_parent = true,
                Some("none") => self.fill_parent = false,
                _ => return Err(expected("'parent' or 'none'")),
            },
            Property::Z => {
                let n = value.as_number().ok_or_else(|| expected("a number"))?;
                self.z = n as i32;
            }
            Property::Color | Property::BorderColor => {
                let c = value_to_color(value).ok_or_else(|| expected("a color"))?;
                self.set_color(prop, c);
            }
            _ => {
                let n = value.as_number().ok_or_else(|| expected("a number"))?;
                if !n.is_finite() {
                    return Err(format!("property '{}' must be finite", prop.key()));
                }
                self.set_number(prop, n);
            }
        }
        Ok(())
    }

    pub fn number(&self, prop: Property) -> Option<f32> {
        match prop {
            Property::X => Some(self.x),
            Property::Y => Some(self.y),
            Property::Width => self.width,
            Property::Height => self.height,
            Property::Opacity => Some(self.opacity),
            Property::Radius => Some(self.radius),
            Property::BorderWidth => Some(self.border_width),
            _ => None,
        }
    }

    pub fn color_of(&self, prop: Property) -> Option<Color> {
        match prop {
            Property::Color => Some(self.color),
            Property::BorderColor => Some(self.border_color),
            _ => None,
        }
    }

    pub(crate) fn set_number(&mut self, prop: Property, v: f32) {
        match prop {
            Property::X => self.x = v,
            Property::Y => self.y = v,
            Property::Width => self.width = Some(v.max(0.0)),
            Property::Height => self.height = Some(v.max(0.0)),
            Property::Opacity => self.opacity = v.clamp(0.0, 1.0),
            Property::Radius => self.radius = v.max(0.0),
            Property::BorderWidth => self.border_width = v.max(0.0),
            _ => {}
        }
    }

    pub(crate) fn set_color(&mut self, prop: Property, c: Color) {
        match prop {
            Property::Color => self.color = c,
            Property::BorderColor => self.border_color = c,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_from_every_spelling() {
        let red = Some(Color::from_premul(1.0, 0.0, 0.0, 1.0));
        assert_eq!(value_to_color(&Value::Str("red".into())), red);
        assert_eq!(value_to_color(&Value::Str("#ff0000".into())), red);
        assert_eq!(value_to_color(&Value::Ident("red".into())), red);
        assert_eq!(value_to_color(&Value::Color([255, 0, 0, 255])), red);
        assert_eq!(value_to_color(&Value::Str("not-a-color".into())), None);
        assert_eq!(value_to_color(&Value::Number(1.0)), None);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut props = NodeProps::default();
        let err = props.set(Property::Width, &Value::Str("wide".into())).unwrap_err();
        assert_eq!(err, "property 'width' expects a number, got string");
        assert!(props.set(Property::Visible, &Value::Number(3.0)).is_ok());
        assert!(props.set(Property::Fill, &Value::Ident("window".into())).is_err());
    }

    #[test]
    fn id_from_identifier_or_string() {
        let mut props = NodeProps::default();
        props.set(Property::Id, &Value::Ident("badge".into())).unwrap();
        assert_eq!(props.id.as_deref(), Some("badge"));
        props.set(Property::Id, &Value::Str("lower third".into())).unwrap();
        assert_eq!(props.id.as_deref(), Some("lower third"));
        let err = props.set(Property::Id, &Value::Number(3.0)).unwrap_err();
        assert_eq!(err, "property 'id' expects an identifier, got number");
    }

    #[test]
    fn opacity_is_clamped() {
        let mut props = NodeProps::default();
        props.set(Property::Opacity, &Value::Number(4.0)).unwrap();
        assert_eq!(props.opacity, 1.0);
    }

    #[test]
    fn shape_props_limited_to_shapes() {
        assert!(!NodeKind::Item.accepts(Property::Color));
        assert!(!NodeKind::Circle.accepts(Property::Radius));
        assert!(NodeKind::Video.accepts(Property::Opacity));
    }
}
