//! Customer rows read from the CSV input.

use std::collections::BTreeMap;

/// Partner field name -> value, as sent to `create`.
pub type PartnerFields = BTreeMap<String, String>;

/// One CSV row, keyed by header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerRecord {
    fields: BTreeMap<String, String>,
}

impl CustomerRecord {
    /// Create a record from column/value pairs.
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Name used in status lines.
    pub fn display_name(&self) -> &str {
        self.get("name").unwrap_or_default()
    }

    /// Map columns onto partner fields.
    ///
    /// `mapping` is CSV column -> partner field. Unmapped columns are dropped,
    /// mapped columns missing from the row are skipped.
    pub fn to_partner_fields(&self, mapping: &BTreeMap<String, String>) -> PartnerFields {
        mapping
            .iter()
            .filter_map(|(column, field)| {
                self.fields
                    .get(column)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_to_partner_fields_drops_unmapped_columns() {
        let record = CustomerRecord::new([
            ("name", "Alice"),
            ("email", "a@x.com"),
            ("phone", "555"),
            ("notes", "VIP"),
        ]);
        let fields = record.to_partner_fields(&mapping(&[
            ("name", "name"),
            ("email", "email"),
            ("phone", "phone"),
        ]));

        assert_eq!(fields.len(), 3);
        assert_eq!(fields["name"], "Alice");
        assert_eq!(fields["email"], "a@x.com");
        assert_eq!(fields["phone"], "555");
    }

    #[test]
    fn test_to_partner_fields_renames_columns() {
        let record = CustomerRecord::new([("name", "Bob"), ("mobile_no", "556")]);
        let fields = record.to_partner_fields(&mapping(&[("name", "name"), ("mobile_no", "mobile")]));

        assert_eq!(fields.get("mobile").map(String::as_str), Some("556"));
        assert!(!fields.contains_key("mobile_no"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(CustomerRecord::new([("name", "Alice")]).display_name(), "Alice");
        assert_eq!(CustomerRecord::default().display_name(), "");
    }
}
