//! MARC21-slim record parser
//!
//! Decodes MARC21-xml records, as embedded in DNB SRU responses, into a
//! structured representation with field/subfield accessors. Subfield
//! values are trimmed at decode time and empty values are dropped, so the
//! accessors only ever return non-empty text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// A MARC record containing leader and fields
#[derive(Debug, Clone, Default)]
pub struct MarcRecord {
    /// The 24-character record leader, if present
    pub leader: Option<String>,
    /// Control fields (00X)
    pub control_fields: HashMap<String, String>,
    /// Data fields with indicators and subfields
    pub data_fields: Vec<DataField>,
}

/// A MARC data field (010-999)
#[derive(Debug, Clone)]
pub struct DataField {
    /// Field tag (3 characters)
    pub tag: String,
    /// First indicator
    pub ind1: char,
    /// Second indicator
    pub ind2: char,
    /// Subfields
    pub subfields: Vec<Subfield>,
}

/// A MARC subfield
#[derive(Debug, Clone)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield data
    pub data: String,
}

impl MarcRecord {
    /// Parse a single MARC21-slim record from XML, with or without
    /// namespace prefixes.
    pub fn from_xml(xml: &str) -> AppResult<Self> {
        let stripped = strip_xml_ns(xml);
        let record: XmlRecord = quick_xml::de::from_str(&stripped)
            .map_err(|e| AppError::Xml(format!("failed to parse MARC21-xml record: {}", e)))?;
        Ok(record.into())
    }

    /// Get the first subfield value for a tag and subfield code
    pub fn get_subfield(&self, tag: &str, code: char) -> Option<&str> {
        self.get_fields(tag)
            .into_iter()
            .find_map(|field| field.get_subfield(code))
    }

    /// Get all subfield values for a tag and code, in document order
    pub fn get_all_subfields(&self, tag: &str, code: char) -> Vec<&str> {
        self.get_fields(tag)
            .into_iter()
            .flat_map(|field| field.get_all_subfields(code))
            .collect()
    }

    /// Get a control field value
    pub fn get_control_field(&self, tag: &str) -> Option<&str> {
        self.control_fields.get(tag).map(String::as_str)
    }

    /// Get all data fields with a specific tag
    pub fn get_fields(&self, tag: &str) -> Vec<&DataField> {
        self.data_fields.iter().filter(|f| f.tag == tag).collect()
    }
}

impl DataField {
    /// Get the first subfield value by code
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
    }

    /// Get all subfield values for a code
    pub fn get_all_subfields(&self, code: char) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| sf.code == code)
            .map(|sf| sf.data.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// XML decoding
// ---------------------------------------------------------------------------

/// MARC21-slim record as it appears on the wire (namespace-stripped).
#[derive(Debug, Deserialize)]
pub struct XmlRecord {
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub controlfield: Vec<XmlControlField>,
    #[serde(default)]
    pub datafield: Vec<XmlDataField>,
}

#[derive(Debug, Deserialize)]
pub struct XmlControlField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "$value", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct XmlDataField {
    #[serde(rename = "@tag")]
    pub tag: String,
    #[serde(rename = "@ind1", default)]
    pub ind1: Option<String>,
    #[serde(rename = "@ind2", default)]
    pub ind2: Option<String>,
    #[serde(default)]
    pub subfield: Vec<XmlSubfield>,
}

#[derive(Debug, Deserialize)]
pub struct XmlSubfield {
    #[serde(rename = "@code")]
    pub code: String,
    #[serde(rename = "$value", default)]
    pub value: String,
}

impl From<XmlRecord> for MarcRecord {
    fn from(xml: XmlRecord) -> Self {
        let control_fields = xml
            .controlfield
            .into_iter()
            .map(|cf| (cf.tag, cf.value.trim().to_string()))
            .collect();

        let data_fields = xml
            .datafield
            .into_iter()
            .map(|df| DataField {
                tag: df.tag,
                ind1: first_char(df.ind1.as_deref()),
                ind2: first_char(df.ind2.as_deref()),
                subfields: df
                    .subfield
                    .into_iter()
                    .filter_map(|sf| {
                        let data = sf.value.trim().to_string();
                        if data.is_empty() {
                            return None;
                        }
                        Some(Subfield {
                            code: sf.code.chars().next()?,
                            data,
                        })
                    })
                    .collect(),
            })
            .collect();

        MarcRecord {
            leader: xml.leader.map(|l| l.trim_end().to_string()).filter(|l| !l.is_empty()),
            control_fields,
            data_fields,
        }
    }
}

fn first_char(value: Option<&str>) -> char {
    value.and_then(|v| v.chars().next()).unwrap_or(' ')
}

static XMLNS_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+xmlns(?::\w+)?="[^"]*""#).unwrap());
static NS_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)(\w+):").unwrap());

/// Strip XML namespace declarations and element-name prefixes so the
/// serde structs can match on local names. Handles both the default
/// namespace form (`<record xmlns="…">`) and the prefixed form
/// (`<marc21:record xmlns:marc21="…">`).
pub fn strip_xml_ns(xml: &str) -> String {
    let stripped = XMLNS_DECL.replace_all(xml, "");
    NS_PREFIX.replace_all(&stripped, "<$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIM: &str = r#"
        <record xmlns="http://www.loc.gov/MARC21/slim">
          <leader>00000nam a2200000 c 4500</leader>
          <controlfield tag="001">1136409025</controlfield>
          <datafield tag="245" ind1="1" ind2="0">
            <subfield code="a">Sehnsucht des Herzens</subfield>
            <subfield code="b"> Roman </subfield>
            <subfield code="c"></subfield>
          </datafield>
          <datafield tag="700" ind1="1" ind2=" ">
            <subfield code="a">Lucas, Joanne St.</subfield>
            <subfield code="4">aut</subfield>
          </datafield>
        </record>"#;

    #[test]
    fn parses_slim_record() {
        let record = MarcRecord::from_xml(SLIM).unwrap();
        assert_eq!(record.get_control_field("001"), Some("1136409025"));
        assert_eq!(record.get_subfield("245", 'a'), Some("Sehnsucht des Herzens"));
        // values are trimmed, empty subfields dropped
        assert_eq!(record.get_subfield("245", 'b'), Some("Roman"));
        assert_eq!(record.get_subfield("245", 'c'), None);
        assert_eq!(record.get_subfield("700", '4'), Some("aut"));
    }

    #[test]
    fn parses_prefixed_namespace() {
        let xml = r#"<marc21:record xmlns:marc21="http://www.loc.gov/MARC21/slim">
            <marc21:datafield tag="016" ind1="7" ind2=" ">
              <marc21:subfield code="a">987654321</marc21:subfield>
            </marc21:datafield>
          </marc21:record>"#;
        let record = MarcRecord::from_xml(xml).unwrap();
        assert_eq!(record.get_subfield("016", 'a'), Some("987654321"));
    }

    #[test]
    fn get_fields_preserves_order() {
        let xml = r#"<record>
            <datafield tag="082" ind1=" " ind2=" "><subfield code="a">830</subfield></datafield>
            <datafield tag="082" ind1=" " ind2=" "><subfield code="a">833.92</subfield></datafield>
          </record>"#;
        let record = MarcRecord::from_xml(xml).unwrap();
        assert_eq!(record.get_all_subfields("082", 'a'), vec!["830", "833.92"]);
    }
}
