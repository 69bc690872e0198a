use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::OnceLock;

use super::div_selector;

static FLIGHT_STATUS_RE: OnceLock<Regex> = OnceLock::new();
static AIRPORT_CODE_RE: OnceLock<Regex> = OnceLock::new();
static CITY_RE: OnceLock<Regex> = OnceLock::new();

fn flight_status_re() -> &'static Regex {
    FLIGHT_STATUS_RE.get_or_init(|| Regex::new(r"(?i)Flight Status").expect("valid regex"))
}

fn airport_code_re() -> &'static Regex {
    AIRPORT_CODE_RE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"))
}

fn city_re() -> &'static Regex {
    CITY_RE.get_or_init(|| Regex::new(r"^[A-Za-z\s]+$").expect("valid regex"))
}

/// The element's sole string: its only child if that is text, or the sole
/// string of its only child element. `None` for mixed or empty content.
pub fn own_string<'a>(el: ElementRef<'a>) -> Option<&'a str> {
    let mut children = el.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => ElementRef::wrap(only).and_then(own_string),
        _ => None,
    }
}

/// Recover `(origin, destination)` as `"City (CODE)"` pairs from the
/// container around the "Flight Status" heading.
///
/// `noise` lists exact texts that share the city shape but are not cities
/// (airline code, flight number, airline display names). Returns `None`
/// unless at least two codes and two cities are found.
pub fn extract_route(doc: &Html, noise: &[&str]) -> Option<(String, String)> {
    let heading = doc
        .select(div_selector())
        .find(|div| own_string(*div).is_some_and(|s| flight_status_re().is_match(s)))?;
    let container = heading.parent().and_then(ElementRef::wrap)?;

    let mut codes = Vec::new();
    let mut cities = Vec::new();
    for div in container.select(div_selector()) {
        let Some(raw) = own_string(div) else {
            continue;
        };
        if airport_code_re().is_match(raw) {
            codes.push(raw.trim());
            continue;
        }
        let text = raw.trim();
        if text.is_empty() || !city_re().is_match(raw) {
            continue;
        }
        if text.eq_ignore_ascii_case("Flight Status") || noise.contains(&text) {
            continue;
        }
        if text.split_whitespace().count() <= 3 {
            cities.push(text);
        }
    }

    if codes.len() < 2 || cities.len() < 2 {
        tracing::debug!(
            "route: {} airport codes, {} cities; leaving origin/destination empty",
            codes.len(),
            cities.len()
        );
        return None;
    }

    Some((
        format!("{} ({})", cities[0], codes[0]),
        format!("{} ({})", cities[1], codes[1]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOISE: &[&str] = &["MH", "716", "Malaysia Airlines", "Firefly"];

    fn route(html: &str) -> Option<(String, String)> {
        extract_route(&Html::parse_document(html), NOISE)
    }

    #[test]
    fn pairs_cities_with_codes_in_order() {
        let html = r#"<div class="card">
            <div>Flight Status</div>
            <div>Malaysia Airlines</div>
            <div><div>CGK</div><div>Jakarta</div></div>
            <div><div>KUL</div><div>Kuala Lumpur</div></div>
        </div>"#;
        assert_eq!(
            route(html),
            Some(("Jakarta (CGK)".to_string(), "Kuala Lumpur (KUL)".to_string()))
        );
    }

    #[test]
    fn single_airport_code_degrades_silently() {
        let html = r#"<div>
            <div>Flight Status</div>
            <div>CGK</div><div>Jakarta</div><div>Kuala Lumpur</div>
        </div>"#;
        assert_eq!(route(html), None);
    }

    #[test]
    fn missing_heading_yields_nothing() {
        let html = "<div><div>CGK</div><div>Jakarta</div><div>KUL</div><div>Penang</div></div>";
        assert_eq!(route(html), None);
    }

    #[test]
    fn long_phrases_are_not_cities() {
        let html = r#"<div>
            <div>flight status</div>
            <div>CGK</div><div>KUL</div>
            <div>Track your flight in real time</div>
            <div>Jakarta</div><div>Kuala Lumpur</div>
        </div>"#;
        assert_eq!(
            route(html),
            Some(("Jakarta (CGK)".to_string(), "Kuala Lumpur (KUL)".to_string()))
        );
    }

    #[test]
    fn own_string_follows_single_child_chain() {
        let doc = Html::parse_fragment("<div><span><b>CGK</b></span></div>");
        let div = doc.select(div_selector()).next().unwrap();
        assert_eq!(own_string(div), Some("CGK"));

        let doc = Html::parse_fragment("<div>CGK <b>x</b></div>");
        let div = doc.select(div_selector()).next().unwrap();
        assert_eq!(own_string(div), None);
    }
}
