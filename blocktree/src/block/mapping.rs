use serde_json::Value;

use crate::block::Attrs;

/// Reserved attribute that holds the mapping declarations themselves.
pub const METADATA_KEY: &str = "metadata";
/// Key inside `metadata` that maps attribute names to record field names.
pub const FORM_FIELD_NAMES_KEY: &str = "formFieldNames";

/// One `attribute -> field` pair declared in `attrs.metadata.formFieldNames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping<'a> {
    pub attribute: &'a str,
    pub field: &'a str,
}

/// Mappings declared by a block, in declaration order.
///
/// Malformed declarations are not errors: a non-object `metadata` or
/// `formFieldNames` yields no mappings, and entries whose field name is not a
/// string are skipped. The `metadata` attribute itself can never be mapped.
/// Whether the attribute exists is left to the caller.
pub fn field_mappings(attrs: &Attrs) -> impl Iterator<Item = FieldMapping<'_>> {
    attrs
        .get(METADATA_KEY)
        .and_then(Value::as_object)
        .and_then(|metadata| metadata.get(FORM_FIELD_NAMES_KEY))
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|names| names.iter())
        .filter(|(attribute, _)| attribute.as_str() != METADATA_KEY)
        .filter_map(|(attribute, field)| {
            field.as_str().map(|field| FieldMapping {
                attribute: attribute.as_str(),
                field,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attrs {
        match value {
            Value::Object(map) => map,
            _ => panic!("test attrs must be an object"),
        }
    }

    #[test]
    fn reads_declared_pairs_in_order() {
        let attrs = attrs(json!({
            "content": "hi",
            "url": "x",
            "metadata": { "formFieldNames": { "url": "website", "content": "company_name" } }
        }));
        let pairs: Vec<_> = field_mappings(&attrs)
            .map(|m| (m.attribute, m.field))
            .collect();
        assert_eq!(pairs, [("url", "website"), ("content", "company_name")]);
    }

    #[test]
    fn metadata_attribute_is_never_mapped() {
        let attrs = attrs(json!({
            "metadata": { "formFieldNames": { "metadata": "meta", "title": "title" } }
        }));
        let pairs: Vec<_> = field_mappings(&attrs).map(|m| m.attribute).collect();
        assert_eq!(pairs, ["title"]);
    }

    #[test]
    fn malformed_declarations_yield_nothing() {
        for value in [
            json!({ "metadata": "oops" }),
            json!({ "metadata": { "formFieldNames": ["content"] } }),
            json!({ "metadata": { "formFieldNames": null } }),
            json!({ "metadata": { "name": "Card" } }),
            json!({ "content": "no metadata" }),
        ] {
            assert_eq!(field_mappings(&attrs(value)).count(), 0);
        }
    }

    #[test]
    fn non_string_field_names_are_skipped() {
        let attrs = attrs(json!({
            "metadata": { "formFieldNames": { "a": 1, "b": "bee", "c": null } }
        }));
        let pairs: Vec<_> = field_mappings(&attrs).map(|m| m.field).collect();
        assert_eq!(pairs, ["bee"]);
    }
}
