//! 统计报告文档
//!
//! 报告是一棵树：根为 `network`，嵌套 `layer`，每层下有 `node`/`link`/`demand`。
//! 属性名（如 `avgNumLayers`、`availabilityClassic`）是下游渲染器依赖的稳定契约。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNode {
    pub kind: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportNode>,
}

impl ReportNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 数值属性；非有限值（NaN/∞）写为 0，保证 JSON 可序列化
    pub fn set_num(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        let v = if value.is_finite() { value } else { 0.0 };
        self.set(key, v)
    }

    pub fn push(&mut self, child: ReportNode) {
        self.children.push(child);
    }

    /// 读取数值属性；缺失或非数值返回 None
    pub fn num(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// 按类型与 `id` 属性查找直接子节点
    pub fn child(&self, kind: &str, id: u64) -> Option<&ReportNode> {
        self.children.iter().find(|c| {
            c.kind == kind && c.attributes.get("id").and_then(Value::as_u64) == Some(id)
        })
    }

    pub fn children_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ReportNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// 缩进文本形式，每个节点一行
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out, 0);
        out
    }

    fn write_text(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{}{}", "  ".repeat(depth), self.kind);
        for (k, v) in &self.attributes {
            match v {
                Value::Number(n) => match n.as_f64() {
                    Some(f) if n.is_f64() => {
                        let _ = write!(out, " {k}={f:.4}");
                    }
                    _ => {
                        let _ = write!(out, " {k}={n}");
                    }
                },
                Value::String(s) => {
                    let _ = write!(out, " {k}={s:?}");
                }
                other => {
                    let _ = write!(out, " {k}={other}");
                }
            }
        }
        out.push('\n');
        for c in &self.children {
            c.write_text(out, depth + 1);
        }
    }
}
