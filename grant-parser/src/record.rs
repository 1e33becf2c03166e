//! Normalized patent record shared by every schema variant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Year, month and day substituted when a source date cannot be parsed.
pub const SENTINEL_YMD: (i32, u32, u32) = (1337, 1, 1);

/// Grant category declared by the source document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Utility patent.
    Utility,
    /// Design patent.
    Design,
    /// Plant patent.
    Plant,
    /// Medical (kind code `M`) grant.
    Medical,
    /// The source did not declare a recognizable kind.
    #[default]
    Undefined,
}

impl DocumentType {
    /// Maps an XML `appl-type` attribute value onto a document type.
    pub fn from_declared(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "utility" => Self::Utility,
            "design" => Self::Design,
            "plant" => Self::Plant,
            "medical" => Self::Medical,
            _ => Self::Undefined,
        }
    }
}

/// One extracted patent grant.
///
/// Dates are never absent: an unparseable or missing source date becomes
/// [`sentinel_date`]. Lists default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Country code, document number and kind code concatenated.
    pub publication_number: String,
    /// Grant (issue) date.
    pub publication_date: NaiveDate,
    /// Application number as written by the source.
    pub application_number: String,
    /// Filing date.
    pub application_date: NaiveDate,
    /// Declared grant category.
    pub document_type: DocumentType,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub description: String,
    pub claims: String,
    /// Inventor display names in source order.
    pub inventors: Vec<String>,
    /// Assignee names in source order, organization preferred over person.
    pub assignees: Vec<String>,
    /// International (IPC) classification codes.
    pub international_classifications: Vec<String>,
    /// Cooperative (CPC) classification codes.
    pub cooperative_classifications: Vec<String>,
}

impl Default for PatentRecord {
    fn default() -> Self {
        Self {
            publication_number: String::new(),
            publication_date: sentinel_date(),
            application_number: String::new(),
            application_date: sentinel_date(),
            document_type: DocumentType::Undefined,
            title: String::new(),
            abstract_text: String::new(),
            description: String::new(),
            claims: String::new(),
            inventors: Vec::new(),
            assignees: Vec::new(),
            international_classifications: Vec::new(),
            cooperative_classifications: Vec::new(),
        }
    }
}

/// Fallback date used whenever a source date is unusable (1337-01-01).
pub fn sentinel_date() -> NaiveDate {
    let (year, month, day) = SENTINEL_YMD;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Parses an 8-digit `YYYYMMDD` token, returning the sentinel on any failure.
///
/// ```
/// use grant_parser::record::{parse_date, sentinel_date};
///
/// assert_eq!(parse_date("20020115").to_string(), "2002-01-15");
/// assert_eq!(parse_date("2002011"), sentinel_date());
/// ```
pub fn parse_date(token: &str) -> NaiveDate {
    let token = token.trim();
    if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return sentinel_date();
    }
    NaiveDate::parse_from_str(token, "%Y%m%d").unwrap_or_else(|_| sentinel_date())
}

#[cfg(test)]
mod tests {
    use super::{parse_date, sentinel_date, DocumentType, PatentRecord};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_eight_digit_dates() {
        assert_eq!(parse_date("19760106").to_string(), "1976-01-06");
        assert_eq!(parse_date(" 20100105\n").to_string(), "2010-01-05");
    }

    #[test]
    fn falls_back_to_sentinel() {
        for token in ["", "2010010", "201001050", "2010AB05", "20101345", "20100230"] {
            assert_eq!(parse_date(token), sentinel_date(), "token {token:?}");
        }
        assert_eq!(sentinel_date().to_string(), "1337-01-01");
    }

    #[test]
    fn default_record_carries_sentinel_dates_and_undefined_type() {
        let record = PatentRecord::default();
        assert_eq!(record.publication_date, sentinel_date());
        assert_eq!(record.application_date, sentinel_date());
        assert_eq!(record.document_type, DocumentType::Undefined);
        assert!(record.inventors.is_empty());
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let record = PatentRecord {
            publication_number: "US07640598B2".to_string(),
            document_type: DocumentType::Utility,
            ..PatentRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["publication_number"], "US07640598B2");
        assert_eq!(json["document_type"], "utility");
        assert_eq!(json["publication_date"], "1337-01-01");
        assert_eq!(json["abstract"], "");
    }

    #[test]
    fn maps_declared_types() {
        assert_eq!(DocumentType::from_declared("utility"), DocumentType::Utility);
        assert_eq!(DocumentType::from_declared("Design"), DocumentType::Design);
        assert_eq!(DocumentType::from_declared("reissue"), DocumentType::Undefined);
    }
}
