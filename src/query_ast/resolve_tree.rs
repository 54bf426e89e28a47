//! The selection tree of one request field, with arguments already
//! coerced to JSON values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTree {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub fields: Vec<ResolveTree>,
    /// Inline fragment type (`... on Movie`) for selections on interfaces
    /// and unions
    #[serde(default)]
    pub type_condition: Option<String>,
}

impl ResolveTree {
    pub fn new(name: impl Into<String>) -> Self {
        ResolveTree {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Key under which the field appears in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub fn field(&self, name: &str) -> Option<&ResolveTree> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Sub-selections that apply to the given concrete type: unconditional
    /// ones, those on the type itself, and those on one of its composites.
    pub fn fields_for<'t>(
        &'t self,
        type_name: &'t str,
        composites: &'t [&'t str],
    ) -> impl Iterator<Item = &'t ResolveTree> + 't {
        self.fields.iter().filter(move |f| match &f.type_condition {
            None => true,
            Some(condition) => condition == type_name || composites.contains(&condition.as_str()),
        })
    }

    /// Deepest nesting of sub-selections below this field.
    pub fn depth(&self) -> usize {
        1 + self.fields.iter().map(ResolveTree::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_and_navigate() {
        let tree: ResolveTree = serde_json::from_value(json!({
            "name": "movies",
            "alias": "films",
            "args": { "limit": 2, "offset": null },
            "fields": [
                { "name": "title" },
                { "name": "actors", "fields": [{ "name": "name" }] },
                { "name": "episodes", "typeCondition": "Series" }
            ]
        }))
        .unwrap();
        assert_eq!(tree.response_key(), "films");
        assert_eq!(tree.arg("limit"), Some(&json!(2)));
        assert!(tree.arg("offset").is_none());
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.fields_for("Movie", &[]).count(), 2);
        assert_eq!(tree.fields_for("Series", &[]).count(), 3);
    }
}
