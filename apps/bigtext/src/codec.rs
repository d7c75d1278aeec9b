//! Query-string persistence: a session exports to and imports from a flat
//! `key=value` mapping, and share links carry it on a base URL.

use url::{form_urlencoded, Url};

use crate::fit::oracle::LayoutOracle;
use crate::session::{BigText, TEXT_PARAM};

/// Encodes the session's text and exported options as a query string.
pub fn export_query<O: LayoutOracle>(session: &BigText<O>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(session.export())
        .finish()
}

/// Imports a query string (with or without its leading `?`). Unknown keys
/// are ignored; malformed values are coerced by the sanitizers.
pub fn import_query<O: LayoutOracle>(session: &mut BigText<O>, query: &str) {
    let query = query.strip_prefix('?').unwrap_or(query);
    session.import(form_urlencoded::parse(query.as_bytes()));
}

/// Parses a query string into its pairs, in order.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// `base` with the session's state as its query. Parameters of `base` that
/// the session doesn't own are kept, ahead of the session's own.
pub fn share_url<O: LayoutOracle>(base: &Url, session: &BigText<O>) -> Url {
    let spec = session.store().spec();
    let foreign: Vec<(String, String)> = base
        .query_pairs()
        .into_owned()
        .filter(|(key, _)| key != TEXT_PARAM && spec.index_of(key).is_none())
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(foreign)
        .extend_pairs(session.export());
    url
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fit::engine::FitTuning;
    use crate::fit::simulated::MetricsOracle;
    use crate::options::catalog;
    use crate::options::value::OptionValue;
    use crate::render::surface::{RenderingContext, Surface, SurfaceId};

    fn session(query: &str) -> BigText<MetricsOracle> {
        let context = RenderingContext::standard().with(SurfaceId::Text, Surface::attached(800.0, 300.0));
        BigText::new(
            Arc::new(catalog::compiled().unwrap()),
            context,
            MetricsOracle::new(800.0, 600.0),
            FitTuning::default(),
            parse_query(query),
        )
    }

    #[test]
    fn test_export_starts_with_text_and_is_url_encoded() {
        let session = session("?text=Hello%20there&layout=row");
        let query = export_query(&session);
        assert!(query.starts_with("text=Hello+there&background-color=%23ffffff&"), "{query}");
        assert!(query.contains("&layout=row&"));
        assert!(!query.contains("image-mode"));
    }

    #[test]
    fn test_query_round_trip_into_fresh_session() {
        let original = session("text=BIG%0ATEXT&text-align=right&countdown-format=dhms&background-opacity=16");
        let query = export_query(&original);

        let restored = session(&query);
        assert_eq!(export_query(&restored), query);
        assert_eq!(restored.text(), "BIG\nTEXT");
        assert_eq!(restored.get("background-opacity").unwrap(), &OptionValue::Int(16));
    }

    #[test]
    fn test_import_tolerates_garbage() {
        let mut session = session("");
        import_query(&mut session, "?image-size=lots&layout=diagonal&nope=1&=&text-shadow-blur=9");
        assert_eq!(session.get("image-size").unwrap(), &OptionValue::Int(50));
        assert_eq!(session.get("layout").unwrap(), &OptionValue::from("column"));
        assert_eq!(session.get("text-shadow-blur").unwrap(), &OptionValue::Float(1.0));
    }

    #[test]
    fn test_share_url_keeps_foreign_params() {
        let session = session("text=HI&justify=flex-end");
        let base = Url::parse("https://bigtext.example/show?ref=mail&justify=center&text=OLD").unwrap();
        let url = share_url(&base, &session);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("ref".to_string(), "mail".to_string()));
        assert_eq!(pairs[1], ("text".to_string(), "HI".to_string()));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "justify").count(), 1);
        assert!(pairs.contains(&("justify".to_string(), "flex-end".to_string())));
        assert_eq!(url.path(), "/show");
    }
}
