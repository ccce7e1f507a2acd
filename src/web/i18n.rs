//! Message bundles compiled into the binary, one JSON tree per locale.
//! Keys are dotted paths (`projects.title`). Lookup falls back to the default
//! locale's bundle, then to the key itself.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::warn;

use crate::config::LocaleConfig;

static BUNDLES: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    let raw = [("en", include_str!("../../messages/en.json")), ("mk", include_str!("../../messages/mk.json"))];
    let mut out = HashMap::new();
    for (locale, text) in raw {
        match serde_json::from_str::<Value>(text) {
            Ok(v) => {
                out.insert(locale, v);
            }
            Err(e) => warn!(target: "i18n", locale, error = %e, "message bundle is not valid JSON"),
        }
    }
    out
});

fn lookup<'a>(bundle: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.').try_fold(bundle, |node, part| node.get(part))?.as_str()
}

/// Messages resolved for one request's locale.
#[derive(Clone, Copy)]
pub struct Messages {
    primary: Option<&'static Value>,
    fallback: Option<&'static Value>,
}

impl Messages {
    pub fn new(locale: &str, default_locale: &str) -> Self {
        Self { primary: BUNDLES.get(locale), fallback: BUNDLES.get(default_locale) }
    }

    pub fn t<'k>(&self, key: &'k str) -> &'k str {
        self.primary
            .and_then(|b| lookup(b, key))
            .or_else(|| self.fallback.and_then(|b| lookup(b, key)))
            .unwrap_or(key)
    }
}

/// Pick the best supported locale for an `Accept-Language` header value.
/// Higher `q` wins; among equals the header order is kept. A region tag
/// (`mk-MK`) matches its primary language.
pub fn negotiate(accept_language: Option<&str>, locales: &LocaleConfig) -> String {
    let Some(header) = accept_language else {
        return locales.default.clone();
    };
    let mut ranges: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut it = part.split(';');
            let tag = it.next()?.trim().to_ascii_lowercase();
            if tag.is_empty() {
                return None;
            }
            let q = it
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then_some((tag, q))
        })
        .collect();
    ranges.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (tag, _) in &ranges {
        let primary = tag.split('-').next().unwrap_or(tag);
        if let Some(found) = locales
            .supported
            .iter()
            .find(|l| l.eq_ignore_ascii_case(tag) || l.eq_ignore_ascii_case(primary))
        {
            return found.clone();
        }
    }
    locales.default.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundles_load_and_translate() {
        let en = Messages::new("en", "en");
        let mk = Messages::new("mk", "en");
        assert_eq!(en.t("projects.title"), "Projects");
        assert_eq!(mk.t("projects.title"), "Проекти");
        assert_eq!(mk.t("errors.notFound"), "Не е пронајдено");
    }

    #[test]
    fn falls_back_to_default_then_key() {
        let mk = Messages::new("mk", "en");
        assert_eq!(mk.t("errors.rejected"), "The API rejected the request.");
        assert_eq!(mk.t("no.such.key"), "no.such.key");
        let unknown = Messages::new("de", "en");
        assert_eq!(unknown.t("nav.home"), "Home");
        // a branch is not a message
        assert_eq!(unknown.t("nav"), "nav");
    }

    #[test]
    fn negotiation() {
        let l = LocaleConfig::default();
        assert_eq!(negotiate(None, &l), "en");
        assert_eq!(negotiate(Some("mk-MK,mk;q=0.9,en;q=0.8"), &l), "mk");
        assert_eq!(negotiate(Some("de-DE,de;q=0.9"), &l), "en");
        assert_eq!(negotiate(Some("en;q=0.5, mk"), &l), "mk");
        assert_eq!(negotiate(Some("mk;q=0, en"), &l), "en");
        assert_eq!(negotiate(Some(""), &l), "en");
    }
}
