/// Arrow schemas and column names for the flat files behind the dashboard.
///
/// Every column is read as nullable `Utf8`; typed coercion happens in
/// [`crate::coerce`] so a malformed cell degrades one record instead of
/// failing the whole file.
pub mod tabular {
    use arrow::datatypes::{DataType, Field, Schema};
    use serde::{Deserialize, Serialize};

    /// Column names of the transaction ledger. Configurable because ledger
    /// exports come from different reporting tools.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LedgerColumns {
        pub date: String,
        pub points: String,
        pub subject_key: String,
        pub label: String,
        pub document_id: String,
        /// Optional: a ledger without it simply has no seasons.
        pub season: String,
    }

    impl Default for LedgerColumns {
        fn default() -> Self {
            Self {
                date: "sale_date".into(),
                points: "points".into(),
                subject_key: "account_key".into(),
                label: "specifier".into(),
                document_id: "document_id".into(),
                season: "season".into(),
            }
        }
    }

    impl LedgerColumns {
        /// Columns a ledger file must provide.
        pub fn required(&self) -> [&str; 5] {
            [
                self.date.as_str(),
                self.points.as_str(),
                self.subject_key.as_str(),
                self.label.as_str(),
                self.document_id.as_str(),
            ]
        }
    }

    /// Campaign and activation files.
    pub mod campaign {
        pub const TITLE: &str = "title";
        pub const PRIZE: &str = "prize";
        pub const MINIMUM: &str = "minimum_points";
        pub const WINNER_CAP: &str = "winner_cap";
        pub const START: &str = "start_date";
        pub const END: &str = "end_date";
        pub const BONUS_PCT: &str = "bonus_pct";
        pub const DESCRIPTION: &str = "description";
        pub const STATUS: &str = "status";

        pub const REQUIRED: &[&str] = &[TITLE, MINIMUM, START, END];
        pub const ALL: &[&str] = &[
            TITLE,
            PRIZE,
            MINIMUM,
            WINNER_CAP,
            START,
            END,
            BONUS_PCT,
            DESCRIPTION,
            STATUS,
        ];
    }

    /// Season prize files.
    pub mod prize {
        pub const TITLE: &str = "title";
        pub const TARGET: &str = "target_points";
        pub const SEASON: &str = "season";
        pub const DESCRIPTION: &str = "description";
        pub const STATUS: &str = "status";
        pub const CATEGORY: &str = "target_category";

        pub const REQUIRED: &[&str] = &[TITLE, TARGET, SEASON];
        pub const ALL: &[&str] = &[TITLE, TARGET, SEASON, DESCRIPTION, STATUS, CATEGORY];
    }

    /// A schema of nullable `Utf8` fields with the given names, in order.
    pub fn text_schema<'a>(names: impl IntoIterator<Item = &'a str>) -> Schema {
        Schema::new(
            names
                .into_iter()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::tabular::{self, LedgerColumns};
    use arrow::datatypes::DataType;

    #[test]
    fn text_schema_is_nullable_utf8() {
        let schema = tabular::text_schema(LedgerColumns::default().required());
        assert_eq!(schema.fields().len(), 5);
        assert!(schema.field_with_name("sale_date").is_ok());
        assert!(schema.field_with_name("season").is_err());
        assert!(
            schema
                .fields()
                .iter()
                .all(|f| f.data_type() == &DataType::Utf8 && f.is_nullable())
        );
    }

    #[test]
    fn campaign_required_columns_are_known() {
        for col in tabular::campaign::REQUIRED {
            assert!(tabular::campaign::ALL.contains(col));
        }
        for col in tabular::prize::REQUIRED {
            assert!(tabular::prize::ALL.contains(col));
        }
    }

    #[test]
    fn renamed_ledger_columns() {
        let cols = LedgerColumns {
            date: "Data da Venda".into(),
            points: "Pontos".into(),
            ..Default::default()
        };
        assert_eq!(
            cols.required(),
            ["Data da Venda", "Pontos", "account_key", "specifier", "document_id"]
        );
    }
}
