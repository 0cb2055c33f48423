//! Data → node tree transforms.
//!
//! A [`DataTransformer`] turns a JSON value into root-level [`VisualNode`]s.
//! Strategies are tried in order by a [`TransformerChain`]; the generic
//! [`JsonTransformer`] accepts anything and is the final fallback.

use crate::error::VisualizerError;
use crate::model::{MAX_TREE_DEPTH, NodeKind, NodeTree, VisualNode};
use serde_json::Value;
use std::collections::HashMap;

/// Computes a display value for a leaf. `Ok(None)` keeps the default.
pub type ValueProvider = Box<dyn Fn(&Value) -> Result<Option<String>, String>>;

/// Key given to the top-level value.
pub const ROOT_KEY: &str = "root";

// ─── Context ─────────────────────────────────────────────────────────────

/// State shared by one transform run.
pub struct TransformContext {
    max_depth: usize,
    value_provider: Option<ValueProvider>,
    issued: HashMap<String, usize>,
}

impl Default for TransformContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformContext")
            .field("max_depth", &self.max_depth)
            .field("value_provider", &self.value_provider.is_some())
            .field("issued", &self.issued.len())
            .finish()
    }
}

impl TransformContext {
    /// `max_depth` is capped at [`MAX_TREE_DEPTH`].
    pub fn new(max_depth: Option<u32>) -> Self {
        let max_depth = max_depth
            .map(|d| (d as usize).min(MAX_TREE_DEPTH))
            .unwrap_or(MAX_TREE_DEPTH);
        Self {
            max_depth,
            value_provider: None,
            issued: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_value_provider(mut self, provider: ValueProvider) -> Self {
        self.value_provider = Some(provider);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Run the value provider, if any. Provider errors are logged and
    /// treated as "no override".
    pub fn provide_value(&self, data: &Value) -> Option<String> {
        let provider = self.value_provider.as_ref()?;
        match provider(data) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("value provider failed: {e}");
                None
            }
        }
    }

    /// Reserve `base` as a node id, suffixing `_{n}` if it was already
    /// issued in this run.
    pub fn claim_id(&mut self, base: &str) -> String {
        let count = self.issued.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return base.to_string();
        }
        let mut n = *count;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.issued.contains_key(&candidate) {
                self.issued.insert(candidate.clone(), 1);
                return candidate;
            }
            n += 1;
        }
    }
}

// ─── Strategy trait ──────────────────────────────────────────────────────

pub trait DataTransformer {
    fn name(&self) -> &'static str;

    fn can_handle(&self, data: &Value, ctx: &TransformContext) -> bool;

    /// Transform `data` found under `parent_key` at depth `level`.
    fn transform(
        &self,
        data: &Value,
        level: u32,
        parent_key: &str,
        ctx: &mut TransformContext,
    ) -> Result<Vec<VisualNode>, VisualizerError>;
}

/// Display text of a primitive. Strings are shown unquoted.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A string or number field usable as a node title.
fn title_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match data.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ─── Generic JSON walker ─────────────────────────────────────────────────

/// Walks any JSON value: objects and arrays become branch nodes,
/// primitives become leaves.
#[derive(Debug, Default)]
pub struct JsonTransformer;

impl JsonTransformer {
    fn walk(&self, data: &Value, level: u32, key: &str, ctx: &mut TransformContext) -> VisualNode {
        if level as usize >= ctx.max_depth {
            log::warn!("transform depth limit {} reached at {key}", ctx.max_depth);
            let id = ctx.claim_id(&format!("{key}_truncated"));
            return VisualNode::new(&id, format!("{key} (truncated)"), NodeKind::Leaf, level)
                .with_data(data.clone());
        }

        match data {
            Value::Array(items) => {
                let id = ctx.claim_id(&format!("{key}_array"));
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.walk(item, level + 1, &format!("[{i}]"), ctx))
                    .collect();
                VisualNode::new(&id, format!("{key} [{}]", items.len()), NodeKind::Array, level)
                    .with_data(data.clone())
                    .with_children(children)
            }
            Value::Object(map) => {
                let id = ctx.claim_id(&format!("{key}_object"));
                let name = title_field(data, &["name", "id"]).unwrap_or_else(|| key.to_string());
                let kind = if level == 0 { NodeKind::Root } else { NodeKind::Object };
                let children = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "name" && k.as_str() != "id")
                    .map(|(k, v)| self.walk(v, level + 1, k, ctx))
                    .collect();
                VisualNode::new(&id, name, kind, level)
                    .with_data(data.clone())
                    .with_children(children)
            }
            primitive => {
                let id = ctx.claim_id(&format!("{key}_leaf"));
                let value = ctx
                    .provide_value(primitive)
                    .unwrap_or_else(|| display_value(primitive));
                VisualNode::new(&id, key, NodeKind::Leaf, level)
                    .with_value(value)
                    .with_data(primitive.clone())
            }
        }
    }
}

impl DataTransformer for JsonTransformer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn can_handle(&self, _data: &Value, _ctx: &TransformContext) -> bool {
        true
    }

    fn transform(
        &self,
        data: &Value,
        level: u32,
        parent_key: &str,
        ctx: &mut TransformContext,
    ) -> Result<Vec<VisualNode>, VisualizerError> {
        Ok(vec![self.walk(data, level, parent_key, ctx)])
    }
}

// ─── Collection walker ───────────────────────────────────────────────────

const COLLECTION_KEYS: [&str; 6] = ["children", "items", "members", "elements", "collection", "data"];
const TITLE_KEYS: [&str; 3] = ["name", "title", "label"];

/// Walks arrays of records that nest further records under a collection
/// key such as `children` or `items`.
#[derive(Debug, Default)]
pub struct HierarchicalTransformer;

impl HierarchicalTransformer {
    fn has_nested(item: &Value) -> bool {
        COLLECTION_KEYS
            .iter()
            .any(|k| item.get(*k).and_then(Value::as_array).is_some_and(|a| !a.is_empty()))
    }

    fn collections(item: &Value) -> impl Iterator<Item = (&'static str, &Vec<Value>)> + '_ {
        COLLECTION_KEYS
            .iter()
            .filter_map(move |k| item.get(*k).and_then(Value::as_array).map(|a| (*k, a)))
    }

    fn is_leaf_item(item: &Value) -> bool {
        let flag = |k: &str| item.get(k).is_some_and(|v| v.as_bool().unwrap_or(!v.is_null()));
        !Self::has_nested(item)
            || item.get("type").and_then(Value::as_str) == Some("leaf")
            || flag("isLeaf")
            || flag("terminal")
    }

    /// `id` field, falling back to the position in the collection.
    fn item_key(item: &Value, index: usize) -> String {
        match item.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => index.to_string(),
        }
    }

    fn nested_item(
        &self,
        item: &Value,
        level: u32,
        index: usize,
        collection: &str,
        ctx: &mut TransformContext,
    ) -> VisualNode {
        let id = ctx.claim_id(&format!("{collection}_{}", Self::item_key(item, index)));
        let name = title_field(item, &TITLE_KEYS).unwrap_or_else(|| format!("{collection} {}", index + 1));
        let mut node = VisualNode::new(&id, name, NodeKind::Object, level).with_data(item.clone());
        node.set_meta("collectionType", collection);

        let mut children = Vec::new();
        if Self::has_nested(item) && (level as usize) + 1 < ctx.max_depth {
            for (key, items) in Self::collections(item) {
                for (i, child) in items.iter().enumerate() {
                    let child_node = if Self::is_leaf_item(child) {
                        self.leaf_item(child, level + 1, i, ctx)
                    } else {
                        self.nested_item(child, level + 1, i, key, ctx)
                    };
                    children.push(child_node);
                }
            }
        }
        node.with_children(children)
    }

    fn leaf_item(&self, item: &Value, level: u32, index: usize, ctx: &mut TransformContext) -> VisualNode {
        let id = ctx.claim_id(&format!("leaf_{}", Self::item_key(item, index)));
        let name = title_field(item, &TITLE_KEYS).unwrap_or_else(|| format!("Item {}", index + 1));
        let item_type = title_field(item, &["type", "category"]).unwrap_or_else(|| "item".to_string());
        let mut node = VisualNode::new(&id, name, NodeKind::Leaf, level).with_data(item.clone());
        node.set_meta("itemType", item_type);
        if let Some(value) = ctx.provide_value(item) {
            node = node.with_value(value);
        }
        node
    }
}

impl DataTransformer for HierarchicalTransformer {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn can_handle(&self, data: &Value, _ctx: &TransformContext) -> bool {
        data.as_array()
            .is_some_and(|items| items.iter().any(|i| i.is_object() && Self::has_nested(i)))
    }

    fn transform(
        &self,
        data: &Value,
        level: u32,
        _parent_key: &str,
        ctx: &mut TransformContext,
    ) -> Result<Vec<VisualNode>, VisualizerError> {
        let items = data.as_array().ok_or_else(|| {
            VisualizerError::Transform("hierarchical transform expects an array".to_string())
        })?;

        let mut roots = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let id = ctx.claim_id(&format!("container_{}", Self::item_key(item, index)));
            let name = title_field(item, &TITLE_KEYS).unwrap_or_else(|| format!("Container {}", index + 1));
            let kind = if level == 0 { NodeKind::Root } else { NodeKind::Object };
            let mut node = VisualNode::new(&id, name, kind, level).with_data(item.clone());
            node.set_meta("isContainer", "true");

            let mut children = Vec::new();
            for (key, nested) in Self::collections(item) {
                for (i, child) in nested.iter().enumerate() {
                    children.push(self.nested_item(child, level + 1, i, key, ctx));
                }
            }
            roots.push(node.with_children(children));
        }
        Ok(roots)
    }
}

// ─── Chain ───────────────────────────────────────────────────────────────

/// Ordered transformer list; the first one that accepts the data runs.
pub struct TransformerChain {
    transformers: Vec<Box<dyn DataTransformer>>,
}

impl std::fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.transformers.iter().map(|t| t.name()))
            .finish()
    }
}

impl Default for TransformerChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TransformerChain {
    pub fn new(transformers: Vec<Box<dyn DataTransformer>>) -> Self {
        Self { transformers }
    }

    /// Collection walker first, generic walker otherwise.
    pub fn hierarchical() -> Self {
        Self::new(vec![Box::new(HierarchicalTransformer)])
    }

    pub fn push(&mut self, transformer: Box<dyn DataTransformer>) {
        self.transformers.push(transformer);
    }

    /// Transform `data` with the first matching strategy into a tree.
    ///
    /// # Errors
    /// Propagates the strategy's [`VisualizerError::Transform`].
    pub fn transform_data(&self, data: &Value, ctx: &mut TransformContext) -> Result<NodeTree, VisualizerError> {
        let roots = match self.transformers.iter().find(|t| t.can_handle(data, ctx)) {
            Some(t) => {
                log::debug!("transforming with {}", t.name());
                t.transform(data, 0, ROOT_KEY, ctx)?
            }
            None => JsonTransformer.transform(data, 0, ROOT_KEY, ctx)?,
        };
        Ok(NodeTree::from_roots(roots))
    }
}
