use std::collections::HashMap;

use serde::Deserialize;

use crate::soap::{QueryClause, RangeBound, RangeFilter, SearchRequest};

/// Inputs of the portal page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageParams {
    /// Free-text query; `None` when missing or whitespace only.
    pub query: Option<String>,
    /// Exact facet value; `None` when missing or empty.
    pub facet: Option<String>,
    /// Bounded fields; inputs are named `<field>.min` and `<field>.max`.
    pub ranges: Vec<RangeFilter>,
    pub offset: u32,
}

impl PageParams {
    /// Read `q`, the facet parameter (named after `facet_field`), range bounds and `offset`.
    pub fn from_query(
        raw: &HashMap<String, String>,
        facet_field: Option<&str>,
        range_fields: &[String],
    ) -> Self {
        let query = raw.get("q").filter(|q| !q.trim().is_empty()).cloned();
        let facet = facet_field
            .and_then(|field| raw.get(field))
            .filter(|v| !v.is_empty())
            .cloned();
        let bound = |name: String| {
            raw.get(&name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| RangeBound::parse(v))
        };
        let ranges = range_fields
            .iter()
            .filter_map(|field| {
                let min = bound(format!("{field}.min"));
                let max = bound(format!("{field}.max"));
                (min.is_some() || max.is_some()).then(|| RangeFilter {
                    field: field.clone(),
                    min,
                    max,
                })
            })
            .collect();
        Self {
            query,
            facet,
            ranges,
            offset: parse_offset(raw.get("offset").map(String::as_str)),
        }
    }

    pub fn has_constraints(&self) -> bool {
        self.query.is_some() || self.facet.is_some() || !self.ranges.is_empty()
    }

    pub fn search_request(&self, index: &str, facet_field: Option<&str>) -> SearchRequest {
        let mut req = SearchRequest::new(index);
        if let Some(q) = &self.query {
            req = req.with_query(QueryClause::default_field(q));
        }
        if let (Some(field), Some(value)) = (facet_field, &self.facet) {
            req = req.with_query(QueryClause::field(field, value));
        }
        for range in &self.ranges {
            req = req.with_range(range.clone());
        }
        req
    }

    /// Current bounds of `field` as form input values.
    pub fn range_values(&self, field: &str) -> (String, String) {
        let text = |b: &Option<RangeBound>| b.as_ref().map(ToString::to_string).unwrap_or_default();
        self.ranges
            .iter()
            .find(|r| r.field == field)
            .map(|r| (text(&r.min), text(&r.max)))
            .unwrap_or_default()
    }

    /// Parameters repeated on navigator links.
    pub fn link_params(&self, facet_field: Option<&str>) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.query.clone().unwrap_or_default())];
        if let Some(field) = facet_field {
            params.push((field.to_string(), self.facet.clone().unwrap_or_default()));
        }
        for range in &self.ranges {
            let (min, max) = self.range_values(&range.field);
            if !min.is_empty() {
                params.push((format!("{}.min", range.field), min));
            }
            if !max.is_empty() {
                params.push((format!("{}.max", range.field), max));
            }
        }
        params
    }
}

/// Offsets travel as `xsd:int`: unparsable, negative or out of range reads as 0.
fn parse_offset(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&o| i32::try_from(o).is_ok())
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
pub struct RawParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentParams {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub id: String,
    /// Compare on this field only (default: all fields)
    pub field: Option<String>,
    pub offset: Option<String>,
}

impl SimilarParams {
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref().filter(|f| !f.is_empty())
    }

    pub fn offset(&self) -> u32 {
        parse_offset(self.offset.as_deref())
    }

    pub fn link_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("id".to_string(), self.id.clone())];
        if let Some(field) = self.field() {
            params.push(("field".to_string(), field.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    /// Prefix typed so far
    pub q: Option<String>,
    /// Field to complete on (default field when absent)
    pub field: Option<String>,
}
