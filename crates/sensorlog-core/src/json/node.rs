//! Tree nodes of a parsed JSON document.

use super::{JsonError, JsonValue, is_int_text};
use std::fmt;

/// A named (object member) or unnamed (array element) node.
///
/// A node with children is structural and its own value is ignored.
/// A node without children is a leaf. Empty objects and arrays keep their
/// bracket style through the `is_object`/`is_array` flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonNode {
    pub(super) name: String,
    pub(super) value: JsonValue,
    pub(super) children: Vec<JsonNode>,
    pub(super) is_array: bool,
    pub(super) is_object: bool,
}

impl JsonNode {
    /// Create an empty, unnamed object node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_object: true,
            ..Self::default()
        }
    }

    /// Create an empty object node with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_object: true,
            ..Self::default()
        }
    }

    /// Create a scalar leaf.
    #[must_use]
    pub fn leaf(name: impl Into<String>, value: JsonValue) -> Self {
        Self {
            name: name.into(),
            value,
            ..Self::default()
        }
    }

    /// Create an empty array node.
    #[must_use]
    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_array: true,
            ..Self::default()
        }
    }

    /// Append a child node.
    pub fn push(&mut self, child: JsonNode) {
        self.children.push(child);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    #[must_use]
    pub fn children(&self) -> &[JsonNode] {
        &self.children
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// True only for a leaf whose value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.is_leaf() && self.value.is_null()
    }

    /// Look up a child by name, falling back to a numeric name as position.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonNode> {
        self.children
            .iter()
            .find(|child| child.name == name)
            .or_else(|| {
                if is_int_text(name) {
                    name.parse::<usize>()
                        .ok()
                        .and_then(|pos| self.children.get(pos))
                } else {
                    None
                }
            })
    }

    /// Like [`get`](Self::get), but a missing child is an error.
    pub fn element(&self, name: &str) -> Result<&JsonNode, JsonError> {
        self.get(name)
            .ok_or_else(|| JsonError::NameNotFound(name.to_string()))
    }

    /// Child at a position.
    pub fn element_at(&self, pos: usize) -> Result<&JsonNode, JsonError> {
        self.children
            .get(pos)
            .ok_or(JsonError::IndexOutOfBounds(pos))
    }

    /// True if a child with exactly this name exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.children.iter().any(|child| child.name == name)
    }

    #[must_use]
    pub fn exists_and_not_null(&self, name: &str) -> bool {
        self.children
            .iter()
            .find(|child| child.name == name)
            .is_some_and(|child| !child.is_null())
    }

    /// Milliseconds of a `{ "value": <number>, "unit": <unit> }` node.
    ///
    /// Units: `ms`, `s`, `min`, `h`, `d`. Negative magnitudes count as positive.
    pub fn duration_ms(&self) -> Result<u64, JsonError> {
        let unit = self.element("unit")?.value().as_string()?;
        let multiplier: u64 = match unit.as_str() {
            "ms" => 1,
            "s" => 1_000,
            "min" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(JsonError::UnknownTimeUnit(unit)),
        };

        match self.element("value")?.value() {
            JsonValue::Int(v) => Ok(v.unsigned_abs().saturating_mul(multiplier)),
            JsonValue::Float(v) => Ok((v.abs() * multiplier as f64) as u64),
            _ => Err(JsonError::WrongTimeValueType),
        }
    }

    /// Render this node and its subtree with tab indentation.
    #[must_use]
    pub fn print(&self, level: usize) -> String {
        let mut out = String::new();
        self.write_into(&mut out, level);
        out
    }

    fn write_into(&self, out: &mut String, level: usize) {
        indent(out, level);

        if !self.name.is_empty() {
            out.push('"');
            out.push_str(&self.name);
            out.push_str("\": ");
        }

        if self.children.is_empty() {
            if self.is_array {
                out.push_str("[]");
            } else if self.is_object {
                out.push_str("{}");
            } else {
                out.push_str(&self.value.to_string());
            }
            return;
        }

        let (open, close) = if self.is_array { ('[', ']') } else { ('{', '}') };
        out.push(open);
        out.push('\n');
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            child.write_into(out, level + 1);
        }
        out.push('\n');
        indent(out, level);
        out.push(close);
    }
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push('\t');
    }
}

impl fmt::Display for JsonNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JsonNode {
        let mut root = JsonNode::new();
        root.push(JsonNode::leaf("a", JsonValue::Int(1)));
        root.push(JsonNode::leaf("n", JsonValue::Null));
        let mut list = JsonNode::array("list");
        list.push(JsonNode::leaf("", JsonValue::String("x".into())));
        list.push(JsonNode::leaf("", JsonValue::Bool(true)));
        root.push(list);
        root
    }

    #[test]
    fn lookup_by_name_and_numeric_position() {
        let root = sample();
        assert_eq!(root.element("a").expect("a").value(), &JsonValue::Int(1));
        assert_eq!(root.element("2").expect("2").name(), "list");
        let list = root.element("list").expect("list");
        assert_eq!(
            list.element("1").expect("1").value(),
            &JsonValue::Bool(true)
        );
    }

    #[test]
    fn missing_lookups_are_distinguishable() {
        let root = sample();
        assert_eq!(
            root.element("zzz"),
            Err(JsonError::NameNotFound("zzz".into()))
        );
        assert_eq!(root.element_at(9), Err(JsonError::IndexOutOfBounds(9)));
        assert!(root.element("-1").is_err());
    }

    #[test]
    fn existence_checks() {
        let root = sample();
        assert!(root.exists("n"));
        assert!(!root.exists_and_not_null("n"));
        assert!(root.exists_and_not_null("a"));
        assert!(!root.exists("0"));
    }

    #[test]
    fn structural_nodes_are_not_null() {
        let root = sample();
        assert!(!root.is_null());
        assert!(root.element("n").expect("n").is_null());
    }

    fn duration(value: JsonValue, unit: &str) -> JsonNode {
        let mut node = JsonNode::named("d");
        node.push(JsonNode::leaf("value", value));
        node.push(JsonNode::leaf("unit", JsonValue::String(unit.into())));
        node
    }

    #[test]
    fn durations_convert_to_milliseconds() {
        assert_eq!(duration(JsonValue::Int(250), "ms").duration_ms(), Ok(250));
        assert_eq!(duration(JsonValue::Int(3), "s").duration_ms(), Ok(3_000));
        assert_eq!(
            duration(JsonValue::Int(15), "min").duration_ms(),
            Ok(900_000)
        );
        assert_eq!(
            duration(JsonValue::Float(1.5), "h").duration_ms(),
            Ok(5_400_000)
        );
        assert_eq!(
            duration(JsonValue::Int(1), "d").duration_ms(),
            Ok(86_400_000)
        );
    }

    #[test]
    fn negative_durations_are_absolute() {
        assert_eq!(duration(JsonValue::Int(-2), "s").duration_ms(), Ok(2_000));
        assert_eq!(
            duration(JsonValue::Float(-0.5), "s").duration_ms(),
            Ok(500)
        );
    }

    #[test]
    fn duration_errors() {
        assert_eq!(
            duration(JsonValue::Int(1), "weeks").duration_ms(),
            Err(JsonError::UnknownTimeUnit("weeks".into()))
        );
        assert_eq!(
            duration(JsonValue::String("1".into()), "s").duration_ms(),
            Err(JsonError::WrongTimeValueType)
        );
        assert!(JsonNode::named("d").duration_ms().is_err());
    }

    #[test]
    fn print_uses_bracket_style_and_indentation() {
        let text = sample().print(0);
        assert_eq!(
            text,
            "{\n\t\"a\": 1,\n\t\"n\": null,\n\t\"list\": [\n\t\t\"x\",\n\t\ttrue\n\t]\n}"
        );
    }

    #[test]
    fn empty_array_prints_brackets() {
        assert_eq!(JsonNode::array("e").print(0), "\"e\": []");
    }

    #[test]
    fn empty_object_prints_braces() {
        assert_eq!(JsonNode::new().print(0), "{}");
        assert_eq!(JsonNode::named("o").print(0), "\"o\": {}");
        assert_eq!(JsonNode::leaf("o", JsonValue::Null).print(0), "\"o\": null");
    }
}
