//! Markup rendering
//!
//! The page template is a collaborator behind [`MarkupRenderer`]. The default
//! [`HtmlRenderer`] puts machine-readable state on `data-*` attributes of three
//! root elements (`section#grid`, `tr[data-row-id]`, `footer#grid-totals`),
//! which is all the client ever parses.

use grid_model::{AggregateTotals, Entity, EntityField, QueryParams, SortDirection, SortField};
use grid_store::QueryOutcome;

/// Produces embeddable fragments for query and mutation responses
pub trait MarkupRenderer: Send + Sync {
    /// Full table: rows, pagination and totals
    fn table(&self, outcome: &QueryOutcome) -> String;

    /// One table row
    fn row(&self, entity: &Entity) -> String;

    /// Totals block
    fn totals(&self, totals: &AggregateTotals) -> String;

    /// Error text shown in place of a value
    fn error(&self, message: &str) -> String;

    /// Row followed by out-of-band totals, sent after a successful write
    fn updated_row(&self, entity: &Entity, totals: &AggregateTotals) -> String {
        format!("{}\n{}", self.row(entity), self.totals(totals))
    }

    /// Standalone document wrapping the table
    fn page(&self, outcome: &QueryOutcome) -> String {
        format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Inventory</title></head>\n<body>\n{}\n</body></html>\n",
            self.table(outcome)
        )
    }
}

/// HTML-escape text for element content and double-quoted attributes
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Default HTML renderer
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    table_path: String,
}

impl HtmlRenderer {
    /// Renderer whose links point at `/table`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_path: "/table".to_string(),
        }
    }

    fn link(&self, params: &QueryParams) -> String {
        escape(&format!("{}?{}", self.table_path, params.to_query_string()))
    }

    fn header(&self, params: &QueryParams, field: SortField, label: &str) -> String {
        let aria = if params.sort_field == field {
            match params.sort_dir {
                SortDirection::Asc => " aria-sort=\"ascending\"",
                SortDirection::Desc => " aria-sort=\"descending\"",
            }
        } else {
            ""
        };
        let target = params.clone().toggle_sort(field).with_page(1);
        format!(
            "<th data-sort=\"{field}\"{aria}><a href=\"{}\">{label}</a></th>",
            self.link(&target)
        )
    }

    fn search_form(&self, params: &QueryParams) -> String {
        let options: String = EntityField::ALL
            .iter()
            .map(|f| {
                let selected = if *f == params.search_field { " selected" } else { "" };
                format!("<option value=\"{f}\"{selected}>{f}</option>")
            })
            .collect();
        format!(
            "<form class=\"grid-search\" action=\"{}\" method=\"get\">\
<select name=\"searchField\">{options}</select>\
<input type=\"search\" name=\"searchTerm\" data-focus-key=\"searchTerm\" value=\"{}\">\
<input type=\"hidden\" name=\"limit\" value=\"{}\">\
<input type=\"hidden\" name=\"sortBy\" value=\"{}\">\
<input type=\"hidden\" name=\"sortOrder\" value=\"{}\">\
</form>",
            escape(&self.table_path),
            escape(&params.search_term),
            params.page_size,
            params.sort_field,
            params.sort_dir,
        )
    }

    fn pager(&self, outcome: &QueryOutcome) -> String {
        let page = &outcome.page;
        let mut nav = String::from("<nav class=\"grid-pager\">");
        if page.has_prev {
            let prev = outcome.params.clone().with_page(page.page - 1);
            nav.push_str(&format!("<a rel=\"prev\" href=\"{}\">Previous</a>", self.link(&prev)));
        }
        nav.push_str(&format!(
            "<span>Page {} of {} ({} items)</span>",
            page.page,
            page.total_pages.max(1),
            page.total
        ));
        if page.has_next {
            let next = outcome.params.clone().with_page(page.page + 1);
            nav.push_str(&format!("<a rel=\"next\" href=\"{}\">Next</a>", self.link(&next)));
        }
        nav.push_str("</nav>");
        nav
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupRenderer for HtmlRenderer {
    fn table(&self, outcome: &QueryOutcome) -> String {
        let params = &outcome.params;
        let page = &outcome.page;
        let headers: String = [
            (SortField::Id, "ID"),
            (SortField::Name, "Name"),
            (SortField::Price, "Price"),
            (SortField::Quantity, "Quantity"),
            (SortField::Category, "Category"),
            (SortField::Subtotal, "Subtotal"),
        ]
        .iter()
        .map(|(field, label)| self.header(params, *field, label))
        .collect();
        let rows: Vec<String> = outcome.rows.iter().map(|e| self.row(e)).collect();

        format!(
            "<section id=\"grid\" data-page=\"{}\" data-page-size=\"{}\" data-total=\"{}\" \
data-total-pages=\"{}\" data-has-next=\"{}\" data-has-prev=\"{}\" data-sort-by=\"{}\" \
data-sort-order=\"{}\" data-search-field=\"{}\" data-search-term=\"{}\">\n\
{}\n<table class=\"grid\">\n<thead><tr>{headers}<th></th></tr></thead>\n<tbody>\n{}\n</tbody>\n</table>\n{}\n{}\n</section>",
            page.page,
            page.page_size,
            page.total,
            page.total_pages,
            page.has_next,
            page.has_prev,
            params.sort_field,
            params.sort_dir,
            params.search_field,
            escape(&params.search_term),
            self.search_form(params),
            rows.join("\n"),
            self.totals(&outcome.totals),
            self.pager(outcome),
        )
    }

    fn row(&self, entity: &Entity) -> String {
        let id = entity.id;
        let name = escape(&entity.name);
        let category = escape(&entity.category);
        let subtotal = entity.subtotal();
        format!(
            "<tr id=\"row-{id}\" data-row-id=\"{id}\" data-name=\"{name}\" data-price=\"{price}\" \
data-quantity=\"{quantity}\" data-category=\"{category}\" data-subtotal=\"{subtotal}\">\
<td>{id}</td><td>{name}</td>\
<td class=\"cell\" data-field=\"price\" tabindex=\"0\">{price}</td>\
<td class=\"cell\" data-field=\"quantity\" tabindex=\"0\">{quantity}</td>\
<td>{category}</td><td data-role=\"subtotal\">{subtotal}</td>\
<td><button type=\"button\" data-delete=\"{id}\">Delete</button></td></tr>",
            price = entity.price,
            quantity = entity.quantity,
        )
    }

    fn totals(&self, totals: &AggregateTotals) -> String {
        format!(
            "<footer id=\"grid-totals\" data-total-quantity=\"{q}\" data-total-price=\"{p}\" \
data-grand-total=\"{g}\" data-average-price=\"{a}\" data-count=\"{c}\">\
<span>Items: {c}</span> <span>Units: {q}</span> <span>Price sum: {p}</span> \
<span>Average price: {a}</span> <span>Grand total: {g}</span></footer>",
            q = totals.total_quantity,
            p = totals.total_price,
            g = totals.grand_total,
            a = totals.average_price,
            c = totals.count,
        )
    }

    fn error(&self, message: &str) -> String {
        format!("<span class=\"grid-error\" role=\"alert\">{}</span>", escape(message))
    }
}
