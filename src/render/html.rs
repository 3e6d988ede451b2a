use crate::soap::Exchange;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn page_start(title: &str) -> String {
    let title = html_escape(title);
    format!(
        "<html>\n<head>\n<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\" />\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n"
    )
}

pub const PAGE_END: &str = "</body>\n</html>\n";

/// Facet values offered as a `<select>` below the query input.
pub struct FacetSelect<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub terms: &'a [String],
    pub selected: Option<&'a str>,
}

/// Min/max inputs for one bounded field.
pub struct RangeInput<'a> {
    pub field: &'a str,
    pub min: String,
    pub max: String,
}

pub fn search_form(
    action: &str,
    query: Option<&str>,
    facet: Option<&FacetSelect<'_>>,
    ranges: &[RangeInput<'_>],
) -> String {
    let mut out = format!(
        "<form method=\"GET\" action=\"{}\">\n\
         <p>Query:&nbsp;<input name=\"q\" type=\"text\" size=\"30\" maxlength=\"1024\" value=\"{}\" /><input type=\"submit\" /></p>\n",
        html_escape(action),
        html_escape(query.unwrap_or_default()),
    );
    if let Some(facet) = facet {
        out.push_str(&facet_select(facet));
    }
    for range in ranges {
        let field = html_escape(range.field);
        out.push_str(&format!(
            "<p>{field}:&nbsp;<input name=\"{field}.min\" type=\"text\" size=\"10\" value=\"{}\" />\
             &nbsp;&ndash;&nbsp;<input name=\"{field}.max\" type=\"text\" size=\"10\" value=\"{}\" /></p>\n",
            html_escape(&range.min),
            html_escape(&range.max)
        ));
    }
    out.push_str("</form>\n");
    out
}

fn facet_select(facet: &FacetSelect<'_>) -> String {
    let mut out = format!(
        "<p>{}:&nbsp;<select name=\"{}\" size=\"1\">\n",
        html_escape(facet.label),
        html_escape(facet.name)
    );
    let empty_selected = if facet.selected.is_none() { " selected" } else { "" };
    out.push_str(&format!("    <option{empty_selected}></option>\n"));
    for term in facet.terms {
        let selected = if facet.selected == Some(term.as_str()) { " selected" } else { "" };
        out.push_str(&format!("    <option{selected}>{}</option>\n", html_escape(term)));
    }
    out.push_str("</select></p>\n");
    out
}

pub fn error_paragraph(message: &str) -> String {
    format!(
        "<p><b><span style=\"color:red\">Error:</span></b> {}</p>\n",
        html_escape(message)
    )
}

/// Request, response and fault message of a failed call, each in a `<pre>` block.
pub fn diagnostics(exchange: Option<&Exchange>, message: &str) -> String {
    let (request, response) = exchange
        .map(|e| (e.request.as_str(), e.response.as_deref().unwrap_or_default()))
        .unwrap_or_default();
    format!(
        "<p>Request:<pre>{}</pre></p>\n<p>Response:<pre>{}</pre></p>\n<p>SoapFault:<pre>{}</pre></p>\n",
        html_escape(request),
        html_escape(response),
        html_escape(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_chars() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape(r#"say "hello""#), "say &quot;hello&quot;");
        assert_eq!(html_escape("it's"), "it&#39;s");
    }

    #[test]
    fn form_keeps_query_escaped() {
        let html = search_form("/", Some("\"ice\" <core>"), None, &[]);
        assert!(html.contains(r#"value="&quot;ice&quot; &lt;core&gt;""#));
        assert!(!html.contains("<select"));
    }

    #[test]
    fn form_without_query_has_empty_value() {
        let html = search_form("/", None, None, &[]);
        assert!(html.contains(r#"value="" />"#));
    }

    #[test]
    fn facet_marks_selected_term() {
        let terms = vec!["AWI".to_string(), "PANGAEA".to_string()];
        let facet = FacetSelect {
            name: "dataCenterFull",
            label: "Data Center",
            terms: &terms,
            selected: Some("PANGAEA"),
        };
        let html = search_form("/", None, Some(&facet), &[]);
        assert!(html.contains(r#"<select name="dataCenterFull" size="1">"#));
        assert!(html.contains("    <option></option>\n"));
        assert!(html.contains("    <option>AWI</option>\n"));
        assert!(html.contains("    <option selected>PANGAEA</option>\n"));
    }

    #[test]
    fn facet_without_selection_selects_empty_option() {
        let terms = vec!["AWI".to_string()];
        let facet = FacetSelect {
            name: "dataCenterFull",
            label: "Data Center",
            terms: &terms,
            selected: None,
        };
        let html = search_form("/", None, Some(&facet), &[]);
        assert!(html.contains("    <option selected></option>\n"));
        assert!(html.contains("    <option>AWI</option>\n"));
    }

    #[test]
    fn range_inputs_keep_values() {
        let ranges = [RangeInput {
            field: "maxLatitude",
            min: "-90".into(),
            max: String::new(),
        }];
        let html = search_form("/", None, None, &ranges);
        assert!(html.contains(r#"<input name="maxLatitude.min" type="text" size="10" value="-90" />"#));
        assert!(html.contains(r#"<input name="maxLatitude.max" type="text" size="10" value="" />"#));
    }

    #[test]
    fn diagnostics_escape_payloads() {
        let exchange = Exchange {
            request: "<req/>".into(),
            response: Some("<resp/>".into()),
        };
        let html = diagnostics(Some(&exchange), "bad <thing>");
        assert!(html.contains("<pre>&lt;req/&gt;</pre>"));
        assert!(html.contains("<pre>&lt;resp/&gt;</pre>"));
        assert!(html.contains("<pre>bad &lt;thing&gt;</pre>"));
    }

    #[test]
    fn diagnostics_without_response() {
        let exchange = Exchange {
            request: "<req/>".into(),
            response: None,
        };
        let html = diagnostics(Some(&exchange), "connection refused");
        assert!(html.contains("Request:<pre>&lt;req/&gt;</pre>"));
        assert!(html.contains("Response:<pre></pre>"));
        assert!(html.contains("connection refused"));
    }
}
