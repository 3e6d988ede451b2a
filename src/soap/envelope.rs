//! SOAP 1.1 RPC/encoded request envelopes.

use quick_xml::escape::escape;

use super::types::{QueryClause, RangeBound, RangeFilter, SearchRequest};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Typed value of an operation argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Nil,
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Struct(&'static str, Vec<(&'static str, Value)>),
    Array(&'static str, Vec<Value>),
}

impl Value {
    fn opt_str(s: Option<&str>) -> Self {
        s.map_or(Value::Nil, |s| Value::Str(s.to_string()))
    }
}

impl From<&QueryClause> for Value {
    fn from(clause: &QueryClause) -> Self {
        Value::Struct(
            "SearchRequestQuery",
            vec![
                ("field", Value::opt_str(clause.field.as_deref())),
                ("query", Value::Str(clause.query.clone())),
                ("anyOf", Value::Bool(clause.any_of)),
            ],
        )
    }
}

impl From<&RangeBound> for Value {
    fn from(bound: &RangeBound) -> Self {
        match bound {
            RangeBound::Number(n) => Value::Double(*n),
            RangeBound::Text(s) => Value::Str(s.clone()),
        }
    }
}

impl From<&RangeFilter> for Value {
    fn from(range: &RangeFilter) -> Self {
        Value::Struct(
            "SearchRequestRange",
            vec![
                ("field", Value::Str(range.field.clone())),
                ("min", range.min.as_ref().map_or(Value::Nil, Value::from)),
                ("max", range.max.as_ref().map_or(Value::Nil, Value::from)),
            ],
        )
    }
}

impl From<&SearchRequest> for Value {
    fn from(req: &SearchRequest) -> Self {
        Value::Struct(
            "SearchRequest",
            vec![
                ("index", Value::Str(req.index.clone())),
                ("sortField", Value::opt_str(req.sort_field.as_deref())),
                ("sortReverse", req.sort_reverse.map_or(Value::Nil, Value::Bool)),
                (
                    "queries",
                    Value::Array(
                        "SearchRequestQuery",
                        req.queries.iter().map(Value::from).collect(),
                    ),
                ),
                (
                    "ranges",
                    Value::Array(
                        "SearchRequestRange",
                        req.ranges.iter().map(Value::from).collect(),
                    ),
                ),
            ],
        )
    }
}

/// Build the envelope for `operation` with positional arguments `in0..inN`.
pub(crate) fn envelope(namespace: &str, operation: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    out.push_str(&format!(
        r#"<soapenv:Envelope xmlns:soapenv="{ENVELOPE_NS}" xmlns:soapenc="{ENCODING_NS}" xmlns:xsd="{XSD_NS}" xmlns:xsi="{XSI_NS}"><soapenv:Body>"#
    ));
    out.push_str(&format!(
        r#"<ns1:{operation} soapenv:encodingStyle="{ENCODING_NS}" xmlns:ns1="{}">"#,
        escape(namespace)
    ));
    for (i, arg) in args.iter().enumerate() {
        write_value(&mut out, &format!("in{i}"), arg);
    }
    out.push_str(&format!("</ns1:{operation}></soapenv:Body></soapenv:Envelope>"));
    out
}

fn write_value(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Nil => out.push_str(&format!(r#"<{name} xsi:nil="true"/>"#)),
        Value::Str(s) => out.push_str(&format!(
            r#"<{name} xsi:type="xsd:string">{}</{name}>"#,
            escape(s.as_str())
        )),
        Value::Int(n) => out.push_str(&format!(r#"<{name} xsi:type="xsd:int">{n}</{name}>"#)),
        Value::Double(n) => out.push_str(&format!(
            r#"<{name} xsi:type="xsd:double">{}</{name}>"#,
            format_double(*n)
        )),
        Value::Bool(b) => out.push_str(&format!(r#"<{name} xsi:type="xsd:boolean">{b}</{name}>"#)),
        Value::Struct(ty, fields) => {
            out.push_str(&format!(r#"<{name} xsi:type="ns1:{ty}">"#));
            for (field, v) in fields {
                write_value(out, field, v);
            }
            out.push_str(&format!("</{name}>"));
        }
        Value::Array(ty, items) => {
            out.push_str(&format!(
                r#"<{name} xsi:type="soapenc:Array" soapenc:arrayType="ns1:{ty}[{}]">"#,
                items.len()
            ));
            for item in items {
                write_value(out, "item", item);
            }
            out.push_str(&format!("</{name}>"));
        }
    }
}

fn format_double(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_names_arguments_positionally() {
        let xml = envelope("urn:Search", "listTerms", &[
            Value::Str("dataportal".into()),
            Value::Str("dataCenterFull".into()),
            Value::Int(65536),
        ]);
        assert!(xml.contains(r#"<ns1:listTerms soapenv:encodingStyle="#));
        assert!(xml.contains(r#"xmlns:ns1="urn:Search""#));
        assert!(xml.contains(r#"<in0 xsi:type="xsd:string">dataportal</in0>"#));
        assert!(xml.contains(r#"<in2 xsi:type="xsd:int">65536</in2>"#));
        assert!(xml.ends_with("</ns1:listTerms></soapenv:Body></soapenv:Envelope>"));
    }

    #[test]
    fn search_request_sends_nil_sort_and_default_field() {
        let req = SearchRequest::new("dataportal").with_query(QueryClause::default_field("ice"));
        let xml = envelope("urn:Search", "search", &[Value::from(&req), Value::Int(0), Value::Int(10)]);

        assert!(xml.contains(r#"<sortField xsi:nil="true"/>"#));
        assert!(xml.contains(r#"<sortReverse xsi:nil="true"/>"#));
        assert!(xml.contains(r#"soapenc:arrayType="ns1:SearchRequestQuery[1]""#));
        assert!(xml.contains(r#"<field xsi:nil="true"/><query xsi:type="xsd:string">ice</query><anyOf xsi:type="xsd:boolean">false</anyOf>"#));
        assert!(xml.contains(r#"soapenc:arrayType="ns1:SearchRequestRange[0]""#));
    }

    #[test]
    fn range_bounds_are_typed() {
        let req = SearchRequest::new("idx").with_range(RangeFilter {
            field: "maxLatitude".into(),
            min: Some(RangeBound::Number(-90.0)),
            max: Some(RangeBound::Text("2008-01-01".into())),
        });
        let xml = envelope("urn:Search", "search", &[Value::from(&req)]);
        assert!(xml.contains(r#"<min xsi:type="xsd:double">-90</min>"#));
        assert!(xml.contains(r#"<max xsi:type="xsd:string">2008-01-01</max>"#));
    }

    #[test]
    fn sort_is_sent_when_set() {
        let req = SearchRequest::new("idx")
            .with_query(QueryClause::default_field("x"))
            .sorted_by("date", true);
        let xml = envelope("urn:Search", "search", &[Value::from(&req)]);
        assert!(xml.contains(r#"<sortField xsi:type="xsd:string">date</sortField>"#));
        assert!(xml.contains(r#"<sortReverse xsi:type="xsd:boolean">true</sortReverse>"#));
    }

    #[test]
    fn text_is_escaped() {
        let xml = envelope("urn:Search", "search", &[Value::Str("a<b & \"c\"".into())]);
        assert!(xml.contains("a&lt;b &amp; &quot;c&quot;"), "got: {xml}");
    }

    #[test]
    fn special_doubles() {
        assert_eq!(format_double(f64::INFINITY), "INF");
        assert_eq!(format_double(f64::NEG_INFINITY), "-INF");
        assert_eq!(format_double(0.5), "0.5");
    }
}
