//! Node styling strategies.
//!
//! Renderers form an ordered list; the first whose `can_handle` accepts a
//! node styles it. Layout and collision only care about the resulting box
//! size, which they read through [`SizeSource`].

use crate::model::{NodeKind, NodeTree, VisualNode};
use crate::id::NodeId;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Box used for any node whose style does not carry a usable size.
pub const DEFAULT_NODE_SIZE: Size = Size::new(160.0, 40.0);

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let byte = |i: usize| -> Option<f32> {
            Some(f32::from(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) / 255.0)
        };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    f32::from(r * 17) / 255.0,
                    f32::from(g * 17) / 255.0,
                    f32::from(b * 17) / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, 1.0)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (c(self.r), c(self.g), c(self.b), c(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

/// Parse a color literal known to be valid; falls back to white.
fn hex(s: &str) -> Color {
    Color::from_hex(s).unwrap_or(Color::WHITE)
}

// ─── Style ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub corner_radius: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub text_color: Option<Color>,
    pub font_size: Option<f64>,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: Some(hex("#2d3748")),
            stroke: Some(hex("#4299e1")),
            stroke_width: Some(2.0),
            corner_radius: Some(8.0),
            width: None,
            height: None,
            text_color: Some(Color::WHITE),
            font_size: Some(12.0),
        }
    }
}

impl NodeStyle {
    /// Box size, with missing or non-positive dimensions taken from
    /// [`DEFAULT_NODE_SIZE`].
    pub fn size(&self) -> Size {
        let pick = |v: Option<f64>, d: f64| match v {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => d,
        };
        Size::new(
            pick(self.width, DEFAULT_NODE_SIZE.width),
            pick(self.height, DEFAULT_NODE_SIZE.height),
        )
    }
}

// ─── Content primitives ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// A drawing primitive positioned relative to the node's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentItem {
    Text {
        x: f64,
        y: f64,
        text: String,
        anchor: TextAnchor,
        class: String,
        font_size: Option<f64>,
        color: Option<Color>,
        bold: bool,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Color,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
}

impl ContentItem {
    fn text(x: f64, y: f64, text: String, anchor: TextAnchor, class: &str) -> Self {
        Self::Text {
            x,
            y,
            text,
            anchor,
            class: class.to_string(),
            font_size: None,
            color: None,
            bold: false,
        }
    }
}

/// Truncate to `max` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

// ─── Renderer strategies ─────────────────────────────────────────────────

/// A styling/rendering strategy for a class of nodes.
pub trait NodeRenderer {
    /// Short name for logs and debugging.
    fn name(&self) -> &'static str;

    fn can_handle(&self, node: &VisualNode) -> bool;

    fn style(&self, node: &VisualNode) -> NodeStyle;

    /// Content drawn inside the node box of size `size`.
    fn render_content(&self, node: &VisualNode, size: Size) -> Vec<ContentItem>;
}

/// Matches every node; colors by node kind, default box size.
#[derive(Debug, Default)]
pub struct DefaultRenderer;

impl NodeRenderer for DefaultRenderer {
    fn name(&self) -> &'static str {
        "default"
    }

    fn can_handle(&self, _node: &VisualNode) -> bool {
        true
    }

    fn style(&self, node: &VisualNode) -> NodeStyle {
        let (fill, stroke) = match node.kind {
            NodeKind::Root => ("#4a5568", "#718096"),
            NodeKind::Object => ("#2d3748", "#4299e1"),
            NodeKind::Array => ("#2c5282", "#3182ce"),
            NodeKind::Leaf => ("#2f855a", "#38a169"),
        };
        NodeStyle {
            fill: Some(hex(fill)),
            stroke: Some(hex(stroke)),
            ..NodeStyle::default()
        }
    }

    fn render_content(&self, node: &VisualNode, size: Size) -> Vec<ContentItem> {
        let cx = size.width / 2.0;
        let cy = size.height / 2.0;
        let name_dy = if node.value.is_some() { -5.0 } else { 0.0 };
        let mut items = vec![ContentItem::text(
            cx,
            cy + name_dy,
            truncate_text(&node.name, 20),
            TextAnchor::Middle,
            "node-name",
        )];
        if let Some(value) = &node.value {
            items.push(ContentItem::text(
                cx,
                cy + 12.0,
                truncate_text(value, 15),
                TextAnchor::Middle,
                "node-value",
            ));
        }
        items
    }
}

const ENTITY_KEYS: [&str; 6] = ["id", "name", "status", "properties", "attributes", "metadata"];
const CONTAINER_KEYS: [&str; 5] = ["children", "items", "members", "elements", "collection"];

fn entity_type(data: &serde_json::Value) -> String {
    ["type", "category", "kind"]
        .iter()
        .find_map(|k| data.get(k).and_then(|v| v.as_str()))
        .unwrap_or("entity")
        .to_string()
}

/// Nodes built from entity-like objects (typed, named, with properties).
#[derive(Debug, Default)]
pub struct EntityRenderer;

impl EntityRenderer {
    fn icon_color(kind: &str) -> Color {
        hex(match kind {
            "primary" | "error" => "#e53e3e",
            "secondary" => "#3182ce",
            "info" | "success" => "#38a169",
            "warning" => "#d69e2e",
            _ => "#718096",
        })
    }

    fn stroke_color(kind: &str) -> Color {
        hex(match kind {
            "primary" | "error" => "#fc8181",
            "secondary" => "#63b3ed",
            "info" | "success" => "#68d391",
            "warning" => "#f6e05e",
            _ => "#cbd5e0",
        })
    }
}

impl NodeRenderer for EntityRenderer {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn can_handle(&self, node: &VisualNode) -> bool {
        let Some(obj) = node.data.as_object() else {
            return false;
        };
        ["type", "category", "kind"]
            .iter()
            .any(|k| obj.get(*k).is_some_and(|v| !v.is_null()))
            || ENTITY_KEYS.iter().any(|k| obj.contains_key(*k))
    }

    fn style(&self, node: &VisualNode) -> NodeStyle {
        NodeStyle {
            fill: Some(hex("#1a202c")),
            stroke: Some(Self::stroke_color(&entity_type(&node.data))),
            stroke_width: Some(2.0),
            corner_radius: Some(12.0),
            width: Some(180.0),
            height: Some(50.0),
            ..NodeStyle::default()
        }
    }

    fn render_content(&self, node: &VisualNode, size: Size) -> Vec<ContentItem> {
        let kind = entity_type(&node.data);
        let cy = size.height / 2.0;
        let mut items = vec![
            ContentItem::Circle {
                cx: 15.0,
                cy,
                r: 6.0,
                fill: Self::icon_color(&kind),
            },
            ContentItem::text(30.0, cy - 8.0, truncate_text(&node.name, 15), TextAnchor::Start, "entity-name"),
            ContentItem::Text {
                x: 30.0,
                y: cy + 8.0,
                text: kind,
                anchor: TextAnchor::Start,
                class: "entity-type".to_string(),
                font_size: Some(10.0),
                color: Some(hex("#a0aec0")),
                bold: false,
            },
        ];
        if let Some(value) = &node.value {
            items.push(ContentItem::Text {
                x: size.width - 10.0,
                y: cy,
                text: value.clone(),
                anchor: TextAnchor::End,
                class: "entity-value".to_string(),
                font_size: None,
                color: Some(hex("#48bb78")),
                bold: true,
            });
        }
        items
    }
}

/// Nodes that group other items (explicit collections or any children).
#[derive(Debug, Default)]
pub struct ContainerRenderer;

impl ContainerRenderer {
    fn item_count(node: &VisualNode) -> usize {
        if node.child_count > 0 {
            return node.child_count;
        }
        CONTAINER_KEYS
            .iter()
            .find_map(|k| node.data.get(*k).and_then(|v| v.as_array()).map(Vec::len))
            .unwrap_or(0)
    }
}

impl NodeRenderer for ContainerRenderer {
    fn name(&self) -> &'static str {
        "container"
    }

    fn can_handle(&self, node: &VisualNode) -> bool {
        node.child_count > 0
            || CONTAINER_KEYS
                .iter()
                .any(|k| node.data.get(*k).is_some_and(|v| v.is_array()))
    }

    fn style(&self, _node: &VisualNode) -> NodeStyle {
        NodeStyle {
            fill: Some(hex("#2d3748")),
            stroke: Some(hex("#4299e1")),
            stroke_width: Some(3.0),
            corner_radius: Some(12.0),
            width: Some(200.0),
            height: Some(60.0),
            ..NodeStyle::default()
        }
    }

    fn render_content(&self, node: &VisualNode, size: Size) -> Vec<ContentItem> {
        let cy = size.height / 2.0;
        let mut items = vec![
            ContentItem::Rect {
                x: 10.0,
                y: cy - 8.0,
                width: 12.0,
                height: 16.0,
                fill: hex("#4299e1"),
            },
            ContentItem::Text {
                x: 30.0,
                y: cy - 5.0,
                text: truncate_text(&node.name, 15),
                anchor: TextAnchor::Start,
                class: "container-name".to_string(),
                font_size: None,
                color: None,
                bold: true,
            },
        ];
        let count = Self::item_count(node);
        if count > 0 {
            items.push(ContentItem::Text {
                x: 30.0,
                y: cy + 8.0,
                text: format!("{count} items"),
                anchor: TextAnchor::Start,
                class: "child-count".to_string(),
                font_size: Some(10.0),
                color: Some(hex("#a0aec0")),
                bold: false,
            });
        }
        items
    }
}

// ─── Size lookup ─────────────────────────────────────────────────────────

/// Anything that can tell the box size of a node.
pub trait SizeSource {
    fn size_of(&self, node: &VisualNode) -> Size;
}

/// Fixed size for every node. Handy for tests and headless layout.
#[derive(Debug, Clone, Copy)]
pub struct UniformSize(pub Size);

impl Default for UniformSize {
    fn default() -> Self {
        Self(DEFAULT_NODE_SIZE)
    }
}

impl SizeSource for UniformSize {
    fn size_of(&self, _node: &VisualNode) -> Size {
        self.0
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Ordered renderer list. First match wins.
pub struct RendererRegistry {
    renderers: Vec<Box<dyn NodeRenderer>>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.renderers.iter().map(|r| r.name()))
            .finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new(vec![Box::new(DefaultRenderer)])
    }
}

impl RendererRegistry {
    pub fn new(renderers: Vec<Box<dyn NodeRenderer>>) -> Self {
        Self { renderers }
    }

    /// Entity, container, then default fallback.
    pub fn hierarchical() -> Self {
        Self::new(vec![
            Box::new(EntityRenderer),
            Box::new(ContainerRenderer),
            Box::new(DefaultRenderer),
        ])
    }

    pub fn push(&mut self, renderer: Box<dyn NodeRenderer>) {
        self.renderers.push(renderer);
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Index of the first renderer that accepts `node`.
    pub fn match_index(&self, node: &VisualNode) -> Option<usize> {
        self.renderers.iter().position(|r| r.can_handle(node))
    }

    pub fn renderer_for(&self, node: &VisualNode) -> Option<&dyn NodeRenderer> {
        self.match_index(node).map(|i| self.renderers[i].as_ref())
    }

    /// Style of `node`, or the plain default style when nothing matches.
    pub fn style_of(&self, node: &VisualNode) -> NodeStyle {
        self.renderer_for(node)
            .map(|r| r.style(node))
            .unwrap_or_default()
    }

    pub fn content_of(&self, node: &VisualNode, size: Size) -> Vec<ContentItem> {
        self.renderer_for(node)
            .map(|r| r.render_content(node, size))
            .unwrap_or_default()
    }

    /// Resolve every node of `tree` once, for a single render pass.
    pub fn resolve_pass(&self, tree: &NodeTree) -> StyleSheet {
        let mut entries = HashMap::with_capacity(tree.len());
        for idx in tree.flatten() {
            let node = tree.node(idx);
            let renderer = self.match_index(node);
            let style = renderer
                .map(|i| self.renderers[i].style(node))
                .unwrap_or_default();
            let size = style.size();
            entries.insert(
                node.id,
                ResolvedStyle {
                    renderer,
                    style,
                    size,
                },
            );
        }
        StyleSheet { entries }
    }
}

impl SizeSource for RendererRegistry {
    fn size_of(&self, node: &VisualNode) -> Size {
        self.style_of(node).size()
    }
}

/// A node's style as resolved for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    /// Index of the renderer that matched, if any.
    pub renderer: Option<usize>,
    pub style: NodeStyle,
    pub size: Size,
}

/// Styles resolved once per node for a whole render pass, so layout and
/// collision inside that pass agree on every node's size.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    entries: HashMap<NodeId, ResolvedStyle>,
}

impl StyleSheet {
    pub fn get(&self, id: NodeId) -> Option<&ResolvedStyle> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SizeSource for StyleSheet {
    fn size_of(&self, node: &VisualNode) -> Size {
        self.entries
            .get(&node.id)
            .map(|s| s.size)
            .unwrap_or(DEFAULT_NODE_SIZE)
    }
}
