use url::form_urlencoded;

use super::html::html_escape;

/// Results per page. The search service is always asked for this many.
pub const PAGE_SIZE: u32 = 10;
/// Page links shown on either side of the current page.
const PAGE_WINDOW: u64 = 10;

/// `<< PREV | 1 | 2 | ... | NEXT >>` links for a result listing.
pub struct Navigator<'a> {
    path: &'a str,
    params: &'a [(String, String)],
    total: u64,
    offset: u64,
}

impl<'a> Navigator<'a> {
    /// `params` are repeated on every link; `offset` is appended per page.
    pub fn new(path: &'a str, params: &'a [(String, String)], total: u64, offset: u64) -> Self {
        Self {
            path,
            params,
            total,
            offset,
        }
    }

    pub fn page(&self) -> u64 {
        self.offset / u64::from(PAGE_SIZE)
    }

    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(PAGE_SIZE))
    }

    pub fn has_prev(&self) -> bool {
        self.page() > 0
    }

    pub fn has_next(&self) -> bool {
        self.page() + 1 < self.pages()
    }

    fn href(&self, page: u64) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (k, v) in self.params {
            query.append_pair(k, v);
        }
        query.append_pair("offset", &page_offset(page).to_string());
        html_escape(&format!("{}?{}", self.path, query.finish()))
    }

    pub fn render(&self) -> String {
        let page = self.page();
        let mut out = String::new();

        if self.has_prev() {
            out.push_str(&format!(r#"<a href="{}">&lt;&lt; PREV</a>"#, self.href(page - 1)));
        } else {
            out.push_str("&lt;&lt; PREV");
        }
        out.push_str(" | ");

        let start = page.saturating_sub(PAGE_WINDOW);
        let end = self.pages().min(page + PAGE_WINDOW);
        for i in start..end {
            if i == page {
                out.push_str(&format!("<b>{}</b>", i + 1));
            } else {
                out.push_str(&format!(r#"<a href="{}">{}</a>"#, self.href(i), i + 1));
            }
            out.push_str(" | ");
        }

        if self.has_next() {
            out.push_str(&format!(r#"<a href="{}">NEXT &gt;&gt;</a>"#, self.href(page + 1)));
        } else {
            out.push_str("NEXT &gt;&gt;");
        }
        out.push('\n');
        out
    }
}

pub fn page_offset(page: u64) -> u64 {
    page * u64::from(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("q".to_string(), "sea ice".to_string()),
            ("dataCenterFull".to_string(), String::new()),
        ]
    }

    #[test]
    fn offset_is_page_times_size() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(3), 30);
    }

    #[test]
    fn first_page_has_no_prev_link() {
        let p = params();
        let nav = Navigator::new("/", &p, 25, 0);
        let html = nav.render();
        assert!(html.starts_with("&lt;&lt; PREV | "));
        assert!(html.contains("<b>1</b>"));
        assert!(html.contains(r#"<a href="/?q=sea+ice&amp;dataCenterFull=&amp;offset=10">2</a>"#));
        assert!(html.contains(r#"<a href="/?q=sea+ice&amp;dataCenterFull=&amp;offset=10">NEXT &gt;&gt;</a>"#));
    }

    #[test]
    fn last_page_has_no_next_link() {
        let p = params();
        let nav = Navigator::new("/", &p, 25, 20);
        assert_eq!(nav.page(), 2);
        assert_eq!(nav.pages(), 3);
        assert!(!nav.has_next());
        let html = nav.render();
        assert!(html.ends_with("NEXT &gt;&gt;\n"));
        assert!(!html.contains(">NEXT"));
        assert!(html.contains(r#"offset=10">&lt;&lt; PREV</a>"#));
        assert!(html.contains("<b>3</b>"));
    }

    #[test]
    fn exact_multiple_has_no_empty_trailing_page() {
        let p = params();
        let nav = Navigator::new("/", &p, 20, 10);
        assert_eq!(nav.pages(), 2);
        assert!(!nav.has_next());
    }

    #[test]
    fn single_page_has_no_links() {
        let p = params();
        let html = Navigator::new("/", &p, 3, 0).render();
        assert!(!html.contains("<a "));
        assert_eq!(html, "&lt;&lt; PREV | <b>1</b> | NEXT &gt;&gt;\n");
    }

    #[test]
    fn empty_result_shows_no_pages() {
        let p = params();
        let html = Navigator::new("/", &p, 0, 0).render();
        assert_eq!(html, "&lt;&lt; PREV | NEXT &gt;&gt;\n");
    }

    #[test]
    fn window_is_limited_to_ten_pages_each_side() {
        let p = params();
        let nav = Navigator::new("/", &p, 1000, 500);
        let html = nav.render();
        assert!(html.contains(">41</a>"));
        assert!(!html.contains(">40</a>"));
        assert!(html.contains("<b>51</b>"));
        assert!(html.contains(">60</a>"));
        assert!(!html.contains(">61</a>"));
    }

    #[test]
    fn mid_page_offset_rounds_down() {
        let p = params();
        let nav = Navigator::new("/", &p, 100, 15);
        assert_eq!(nav.page(), 1);
        assert!(nav.render().contains(r#"offset=0">&lt;&lt; PREV</a>"#));
    }

    #[test]
    fn link_params_are_encoded() {
        let p = vec![("q".to_string(), "a&b \"c\"".to_string())];
        let html = Navigator::new("/", &p, 30, 0).render();
        assert!(html.contains("q=a%26b+%22c%22&amp;offset=10"), "got: {html}");
    }
}
