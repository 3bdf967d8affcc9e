//! Core domain types: the OpenRTB subset enrichment touches, and the
//! classification record returned by the classification service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Name stamped on enriched sites and on the content/data entry we add.
pub const PROVIDER_NAME: &str = "arcspan";

/// Classification taxonomy tag carried in the data entry's `ext.segtax`.
pub const SEGTAX: u32 = 6;

// ---------------------------------------------------------------------------
// OpenRTB
// ---------------------------------------------------------------------------

/// An OpenRTB 2.x bid request. Only `site` is modelled; everything else is
/// carried through verbatim in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidRequest {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// OpenRTB `site` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    /// IAB content categories of the site.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub cat: Vec<String>,

    /// IAB content categories of the current section.
    #[serde(
        rename = "sectioncat",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub section_cat: Vec<String>,

    /// IAB content categories of the current page.
    #[serde(
        rename = "pagecat",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub page_cat: Vec<String>,

    /// URL of the page where the impression is shown.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub page: String,

    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub referrer: String,

    /// Comma-separated keywords.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub keywords: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    /// `publisher`, `mobile`, `privacypolicy` and anything vendor-specific.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// OpenRTB `content` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub cat: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub keywords: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,

    /// Additional content data, one entry per data provider.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Data>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// OpenRTB `data` object: segments supplied by one data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub segment: Vec<Segment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// OpenRTB `segment` object. Enrichment only ever sets `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,

    /// Provider-specific keys (`score`, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Segment {
    /// An identifier-only segment.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Classification record
// ---------------------------------------------------------------------------

/// One revision of the taxonomy: text-derived and image-derived codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
}

impl CodeGroup {
    /// Text codes followed by image codes.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.text.iter().chain(&self.images).map(String::as_str)
    }
}

/// Decoded classification-service response.
///
/// The three groups are successive revisions of the same taxonomy and are
/// independently optional:
/// - `raw`: human-readable keyword paths (`Sports>Soccer`)
/// - `codes`: IAB content categories (`IAB17-44`)
/// - `newCodes`: numeric segment ids of the newer taxonomy (`483`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<CodeGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<CodeGroup>,

    #[serde(
        rename = "newCodes",
        alias = "newcodes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_codes: Option<CodeGroup>,
}

/// `null` reads as the field's empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accepts_partial_groups() {
        let json = r#"{"raw":{"text":["Sports>Soccer"]},"codes":null}"#;
        let record: ClassificationRecord = serde_json::from_str(json).expect("deserialize");
        let raw = record.raw.expect("raw group");
        assert_eq!(raw.text, vec!["Sports>Soccer"]);
        assert!(raw.images.is_empty());
        assert!(record.codes.is_none());
        assert!(record.new_codes.is_none());
    }

    #[test]
    fn record_accepts_lowercase_new_codes() {
        let json = r#"{"newcodes":{"text":["483","533"],"images":null}}"#;
        let record: ClassificationRecord = serde_json::from_str(json).expect("deserialize");
        let group = record.new_codes.expect("newCodes group");
        assert_eq!(group.entries().collect::<Vec<_>>(), vec!["483", "533"]);
    }

    #[test]
    fn code_group_entries_text_then_images() {
        let group = CodeGroup {
            text: vec!["a".into(), "b".into()],
            images: vec!["c".into()],
        };
        assert_eq!(group.entries().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn bid_request_preserves_unknown_fields() {
        let json = r#"{
            "id": "req-1",
            "imp": [{"id": "1"}],
            "site": {
                "page": "https://example.com/a",
                "publisher": {"id": "pub-9"},
                "content": {"livestream": 0, "data": [{"name": "other", "segment": [{"id": "7"}]}]}
            }
        }"#;
        let request: BidRequest = serde_json::from_str(json).expect("deserialize");
        assert!(request.other.contains_key("imp"));

        let site = request.site.as_ref().expect("site");
        assert_eq!(site.page, "https://example.com/a");
        assert_eq!(site.other["publisher"]["id"], "pub-9");
        let content = site.content.as_ref().expect("content");
        assert_eq!(content.other["livestream"], 0);
        assert_eq!(content.data[0].segment[0].id, "7");

        let back = serde_json::to_value(&request).expect("serialize");
        assert_eq!(back["site"]["publisher"]["id"], "pub-9");
        assert_eq!(back["imp"][0]["id"], "1");
    }

    #[test]
    fn site_uses_openrtb_field_names() {
        let site = Site {
            section_cat: vec!["IAB1".into()],
            page_cat: vec!["IAB2".into()],
            referrer: "https://ref.example".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&site).expect("serialize");
        assert_eq!(json["sectioncat"][0], "IAB1");
        assert_eq!(json["pagecat"][0], "IAB2");
        assert_eq!(json["ref"], "https://ref.example");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn site_accepts_null_lists_and_keywords() {
        let json = r#"{
            "page": "https://example.com/a",
            "cat": null,
            "sectioncat": null,
            "pagecat": null,
            "keywords": null,
            "content": {"cat": null, "keywords": null, "data": [{"name": "other", "segment": null}]}
        }"#;
        let site: Site = serde_json::from_str(json).expect("deserialize");
        assert_eq!(site.page, "https://example.com/a");
        assert!(site.cat.is_empty());
        assert!(site.section_cat.is_empty());
        assert!(site.page_cat.is_empty());
        assert!(site.keywords.is_empty());

        let content = site.content.expect("content");
        assert!(content.cat.is_empty());
        assert!(content.keywords.is_empty());
        assert!(content.data[0].segment.is_empty());
    }

    #[test]
    fn data_and_segment_keep_vendor_fields() {
        let json = serde_json::json!({
            "name": "first-party",
            "vendorfield": 1,
            "segment": [{"id": "a", "score": 0.9}]
        });
        let data: Data = serde_json::from_value(json.clone()).expect("deserialize");
        assert_eq!(data.other["vendorfield"], 1);
        assert_eq!(data.segment[0].other["score"], 0.9);
        assert_eq!(serde_json::to_value(&data).expect("serialize"), json);
    }
}
