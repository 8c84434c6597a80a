//! Response fragment parsing
//!
//! The server's markup carries its machine-readable state on `data-*`
//! attributes of three elements:
//! - `section#grid`: the echoed query and pagination metadata
//! - `tr[data-row-id]`: one entity per row
//! - `footer#grid-totals`: aggregate totals
//!
//! Everything else in the body is presentation and is ignored here.

use crate::error::ClientError;
use grid_model::{AggregateTotals, Entity, EntityId, PageInfo, QueryParams};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

static SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<section\s+id="grid"([^>]*)>"#).expect("valid section pattern"));
static ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"<tr\s([^>]*)>").expect("valid row pattern"));
static TOTALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<footer\s+id="grid-totals"([^>]*)>"#).expect("valid totals pattern")
});
static ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)="([^"]*)""#).expect("valid attribute pattern")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// A successful write: the updated row and fresh totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFragment {
    /// Server's copy of the entity after the write
    pub entity: Entity,
    /// Totals for the view the write was issued from
    pub totals: AggregateTotals,
}

/// A full table view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFragment {
    /// Query the server actually applied
    pub params: QueryParams,
    /// Pagination metadata
    pub page: PageInfo,
    /// Rows on this page, in display order
    pub rows: Vec<Entity>,
    /// Totals over the full filtered set
    pub totals: AggregateTotals,
}

struct Attrs {
    element: &'static str,
    values: HashMap<String, String>,
}

impl Attrs {
    fn parse(element: &'static str, raw: &str) -> Self {
        let values = ATTR
            .captures_iter(raw)
            .map(|c| (c[1].to_string(), unescape(&c[2])))
            .collect();
        Self { element, values }
    }

    fn text(&self, name: &str) -> Result<&str, ClientError> {
        self.values.get(name).map(String::as_str).ok_or_else(|| {
            ClientError::MalformedResponse(format!("{} is missing {name}", self.element))
        })
    }

    fn parse_as<T>(&self, name: &str) -> Result<T, ClientError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self.text(name)?;
        text.parse().map_err(|e| {
            ClientError::MalformedResponse(format!("{} has bad {name} {text:?}: {e}", self.element))
        })
    }
}

/// Reverse the server's attribute escaping
#[must_use]
pub fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Visible text of an error fragment
#[must_use]
pub fn display_text(body: &str) -> String {
    unescape(TAG.replace_all(body, "").trim())
}

fn parse_rows(body: &str) -> Result<Vec<Entity>, ClientError> {
    ROW.captures_iter(body)
        .map(|c| Attrs::parse("row", c.get(1).map_or("", |m| m.as_str())))
        .filter(|attrs| attrs.values.contains_key("data-row-id"))
        .map(|attrs| {
            Ok(Entity {
                id: EntityId(attrs.parse_as("data-row-id")?),
                name: attrs.text("data-name")?.to_string(),
                price: attrs.parse_as("data-price")?,
                quantity: attrs.parse_as("data-quantity")?,
                category: attrs.text("data-category")?.to_string(),
            })
        })
        .collect()
}

fn parse_totals(body: &str) -> Result<AggregateTotals, ClientError> {
    let raw = TOTALS
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ClientError::MalformedResponse("no totals block".to_string()))?;
    let attrs = Attrs::parse("totals", raw.as_str());
    Ok(AggregateTotals {
        total_quantity: attrs.parse_as("data-total-quantity")?,
        total_price: attrs.parse_as("data-total-price")?,
        grand_total: attrs.parse_as("data-grand-total")?,
        average_price: attrs.parse_as("data-average-price")?,
        count: attrs.parse_as("data-count")?,
    })
}

/// Parse the response to a field update
///
/// # Errors
/// `MalformedResponse` unless the body holds exactly one row and a totals block
pub fn parse_row_fragment(body: &str) -> Result<RowFragment, ClientError> {
    let mut rows = parse_rows(body)?;
    if rows.len() != 1 {
        return Err(ClientError::MalformedResponse(format!(
            "expected one row, found {}",
            rows.len()
        )));
    }
    let totals = parse_totals(body)?;
    Ok(RowFragment {
        entity: rows.remove(0),
        totals,
    })
}

/// Parse a table view
///
/// # Errors
/// `MalformedResponse` if the grid section, a row or the totals are missing or unreadable
pub fn parse_table_fragment(body: &str) -> Result<TableFragment, ClientError> {
    let raw = SECTION
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| ClientError::MalformedResponse("no grid section".to_string()))?;
    let section = Attrs::parse("grid", raw.as_str());

    let page = PageInfo {
        page: section.parse_as("data-page")?,
        page_size: section.parse_as("data-page-size")?,
        total: section.parse_as("data-total")?,
        total_pages: section.parse_as("data-total-pages")?,
        has_next: section.parse_as("data-has-next")?,
        has_prev: section.parse_as("data-has-prev")?,
    };
    let params = QueryParams {
        page: page.page,
        page_size: page.page_size,
        sort_field: section.parse_as("data-sort-by")?,
        sort_dir: section.parse_as("data-sort-order")?,
        search_field: section.parse_as("data-search-field")?,
        search_term: section.text("data-search-term")?.to_string(),
    };

    Ok(TableFragment {
        params,
        page,
        rows: parse_rows(body)?,
        totals: parse_totals(body)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::{EntityField, Money, SortDirection, SortField};
    use pretty_assertions::assert_eq;

    const ROW_HTML: &str = "<tr id=\"row-7\" data-row-id=\"7\" data-name=\"Oak &quot;Desk&quot; &amp; Co\" \
data-price=\"120.00\" data-quantity=\"3\" data-category=\"Lighting\" data-subtotal=\"360.00\">\
<td>7</td></tr>";
    const TOTALS_HTML: &str = "<footer id=\"grid-totals\" data-total-quantity=\"3\" data-total-price=\"120.00\" \
data-grand-total=\"360.00\" data-average-price=\"120.00\" data-count=\"1\"><span>Items: 1</span></footer>";

    #[test]
    fn row_fragment_unescapes_attributes() {
        let body = format!("{ROW_HTML}\n{TOTALS_HTML}");
        let fragment = parse_row_fragment(&body).unwrap();
        assert_eq!(fragment.entity.id, EntityId(7));
        assert_eq!(fragment.entity.name, "Oak \"Desk\" & Co");
        assert_eq!(fragment.entity.price, Money::from_cents(12_000));
        assert_eq!(fragment.totals.grand_total, Money::from_cents(36_000));
        assert_eq!(fragment.totals.count, 1);
    }

    #[test]
    fn header_rows_are_not_entities() {
        let body = format!("<thead><tr><th>ID</th></tr></thead>{ROW_HTML}{TOTALS_HTML}");
        assert_eq!(parse_row_fragment(&body).unwrap().entity.id, EntityId(7));
    }

    #[test]
    fn table_fragment_reads_section_metadata() {
        let body = format!(
            "<section id=\"grid\" data-page=\"2\" data-page-size=\"10\" data-total=\"11\" \
data-total-pages=\"2\" data-has-next=\"false\" data-has-prev=\"true\" data-sort-by=\"subtotal\" \
data-sort-order=\"desc\" data-search-field=\"category\" data-search-term=\"a &amp; b\">\
<tbody>{ROW_HTML}</tbody>{TOTALS_HTML}</section>"
        );
        let table = parse_table_fragment(&body).unwrap();
        assert_eq!(table.page.page, 2);
        assert!(table.page.has_prev);
        assert_eq!(table.params.sort_field, SortField::Subtotal);
        assert_eq!(table.params.sort_dir, SortDirection::Desc);
        assert_eq!(table.params.search_field, EntityField::Category);
        assert_eq!(table.params.search_term, "a & b");
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn missing_totals_is_malformed() {
        assert!(matches!(
            parse_row_fragment(ROW_HTML),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[test]
    fn bad_number_is_malformed() {
        let body = ROW_HTML.replace("data-quantity=\"3\"", "data-quantity=\"three\"");
        let body = format!("{body}{TOTALS_HTML}");
        assert!(matches!(
            parse_row_fragment(&body),
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[test]
    fn display_text_strips_markup() {
        let body = "<span class=\"grid-error\" role=\"alert\">invalid quantity: -5 is below the minimum 0 &amp; more</span>";
        assert_eq!(
            display_text(body),
            "invalid quantity: -5 is below the minimum 0 & more"
        );
    }
}
