//! JavaServer Faces form handling.
//!
//! JSF pages keep their component tree on the server, keyed by the
//! `javax.faces.ViewState` token. Every post must echo the form's fields and
//! the current token. Ajax posts return a `<partial-response>` whose
//! `<update>` elements carry replacement HTML and, usually, a new token.

use url::Url;

use crate::error::LookupError;
use crate::markup::{self, Element};
use crate::text::unescape;

/// Name of the view-state form field.
pub(crate) const VIEW_STATE: &str = "javax.faces.ViewState";

static_regex!(update_re, r#"(?s)<update\s+id\s*=\s*"([^"]*)"\s*>(.*?)</update>"#);
static_regex!(cdata_re, r"(?s)<!\[CDATA\[(.*?)\]\]>");

/// A form scraped from a JSF page: its id, action, and successful controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Form {
    pub id: String,
    action: String,
    fields: Vec<(String, String)>,
}

impl Form {
    /// Parse the `<form id="form_id">` element of `page`.
    pub fn by_id(page: &str, form_id: &str, endpoint: &str) -> Result<Self, LookupError> {
        let form = markup::find(page, |name, el| {
            name.eq_ignore_ascii_case("form") && el.id().as_deref() == Some(form_id)
        })
        .ok_or_else(|| LookupError::markup(endpoint, format!("form {form_id} not found")))?;
        Self::from_element(page, &form, endpoint)
    }

    /// Parse the first form of `page`.
    pub fn first(page: &str, endpoint: &str) -> Result<Self, LookupError> {
        let form = markup::top_level(page, "form")
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::markup(endpoint, "no form on page"))?;
        Self::from_element(page, &form, endpoint)
    }

    /// Parse the form containing an `<input>` whose id ends with `suffix`.
    pub fn containing_input(page: &str, suffix: &str, endpoint: &str) -> Result<Self, LookupError> {
        let form = markup::top_level(page, "form")
            .into_iter()
            .find(|f| markup::by_id_suffix(f.inner, "input", suffix).is_some())
            .ok_or_else(|| LookupError::markup(endpoint, format!("no form with input *{suffix}")))?;
        Self::from_element(page, &form, endpoint)
    }

    fn from_element(page: &str, form: &Element<'_>, endpoint: &str) -> Result<Self, LookupError> {
        let mut out = Self {
            id: form.id().unwrap_or_default(),
            action: form.attr("action").unwrap_or_default(),
            fields: successful_controls(form.inner),
        };
        if out.view_state().is_none() {
            // Some renderers place the token outside the form.
            let token = markup::find(page, |name, el| {
                name.eq_ignore_ascii_case("input")
                    && (el.attr("name").as_deref() == Some(VIEW_STATE)
                        || el.id().is_some_and(|id| id.contains(VIEW_STATE)))
            })
            .and_then(|el| el.attr("value"))
            .ok_or_else(|| LookupError::markup(endpoint, "javax.faces.ViewState not found"))?;
            out.set(VIEW_STATE, token);
        }
        Ok(out)
    }

    /// Set a field, replacing an existing value or appending a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Current value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Name of the first field whose name ends with `suffix`.
    pub fn field_ending(&self, suffix: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(n, _)| n.ends_with(suffix))
            .map(|(n, _)| n.clone())
    }

    /// The current view-state token.
    pub fn view_state(&self) -> Option<&str> {
        self.get(VIEW_STATE)
    }

    /// Take the new view-state token from a partial response, if it has one.
    pub fn refresh_view_state(&mut self, partial: &PartialResponse) {
        if let Some(token) = partial.view_state() {
            self.set(VIEW_STATE, token);
        }
    }

    /// Absolute URL the form posts to.
    pub fn action_url(&self, page_url: &Url) -> Result<Url, LookupError> {
        if self.action.is_empty() {
            return Ok(page_url.clone());
        }
        page_url.join(&self.action).map_err(|e| {
            crate::config::ConfigError::InvalidUrl(self.action.clone(), e.to_string()).into()
        })
    }

    /// Field pairs in page order, ready for `RequestBuilder::form`.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Fields plus the standard PrimeFaces ajax parameters for an event
    /// fired by `source`.
    pub fn ajax_pairs(&self, source: &str, execute: &str, render: &str) -> Vec<(String, String)> {
        let mut pairs = self.fields.clone();
        for (k, v) in [
            ("javax.faces.partial.ajax", "true"),
            ("javax.faces.source", source),
            ("javax.faces.partial.execute", execute),
            ("javax.faces.partial.render", render),
        ] {
            pairs.push((k.to_string(), v.to_string()));
        }
        pairs
    }
}

/// Controls a browser would submit: named inputs (checked boxes only, no
/// buttons), selects and textareas.
fn successful_controls(form_inner: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for el in markup::elements(form_inner, "input") {
        let Some(name) = el.attr("name") else {
            continue;
        };
        let kind = el.attr("type").unwrap_or_default().to_ascii_lowercase();
        match kind.as_str() {
            "submit" | "button" | "image" | "reset" | "file" => {}
            "checkbox" | "radio" => {
                if el.attr("checked").is_some() {
                    fields.push((name, el.attr("value").unwrap_or_else(|| "on".into())));
                }
            }
            _ => fields.push((name, el.attr("value").unwrap_or_default())),
        }
    }
    for el in markup::elements(form_inner, "select") {
        let Some(name) = el.attr("name") else {
            continue;
        };
        let options = markup::elements(el.inner, "option");
        let chosen = options
            .iter()
            .find(|o| o.attr("selected").is_some())
            .or_else(|| options.first());
        if let Some(option) = chosen {
            let value = option.attr("value").unwrap_or_else(|| option.text());
            fields.push((name, value));
        }
    }
    for el in markup::elements(form_inner, "textarea") {
        if let Some(name) = el.attr("name") {
            fields.push((name, unescape(el.inner)));
        }
    }
    fields
}

/// The `<update>` elements of a JSF partial response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PartialResponse {
    updates: Vec<(String, String)>,
}

impl PartialResponse {
    /// Whether `body` is a partial response rather than a full page.
    pub fn is_partial(body: &str) -> bool {
        body.contains("<partial-response")
    }

    /// Parse the updates of a partial response. A full page yields no updates.
    pub fn parse(body: &str) -> Self {
        let updates = update_re()
            .captures_iter(body)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str().to_string();
                let raw = caps.get(2)?.as_str();
                let content = if raw.contains("<![CDATA[") {
                    // JSF splits embedded `]]>` across consecutive sections.
                    cdata_re()
                        .captures_iter(raw)
                        .filter_map(|c| c.get(1).map(|m| m.as_str()))
                        .collect::<String>()
                } else {
                    unescape(raw)
                };
                Some((id, content))
            })
            .collect();
        Self { updates }
    }

    /// Content of the update with exactly this id.
    pub fn update(&self, id: &str) -> Option<&str> {
        self.updates
            .iter()
            .find(|(uid, _)| uid == id)
            .map(|(_, c)| c.as_str())
    }

    /// The view-state token, under either the JSF 2.0 or 2.2 update id.
    pub fn view_state(&self) -> Option<&str> {
        self.updates
            .iter()
            .find(|(uid, _)| uid.contains(VIEW_STATE))
            .map(|(_, c)| c.trim())
            .filter(|c| !c.is_empty())
    }

    /// All update contents in order, view state excluded.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.updates
            .iter()
            .filter(|(uid, _)| !uid.contains(VIEW_STATE))
            .map(|(_, c)| c.as_str())
    }

    /// Contents of the updates listed in `preferred`, or every update when
    /// none of them is present.
    pub fn preferred(&self, preferred: &[&str]) -> Vec<&str> {
        let picked: Vec<&str> = self
            .updates
            .iter()
            .filter(|(uid, _)| preferred.contains(&uid.as_str()))
            .map(|(_, c)| c.as_str())
            .collect();
        if picked.is_empty() {
            self.fragments().collect()
        } else {
            picked
        }
    }
}

/// Markup to search after a post: the joined update fragments of a partial
/// response, or the body itself for a full page.
pub(crate) fn response_markup(body: &str) -> String {
    if PartialResponse::is_partial(body) {
        PartialResponse::parse(body).fragments().collect::<Vec<_>>().join("\n")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
      <html><body>
      <form id="frmIngreso" name="frmIngreso" method="post" action="/pages/publico/requerimiento.jsf">
        <input type="hidden" name="frmIngreso" value="frmIngreso" />
        <input id="frmIngreso:txtCedula" type="text" name="frmIngreso:txtCedula" value="" />
        <input type="checkbox" name="frmIngreso:acepta" checked />
        <input type="checkbox" name="frmIngreso:otro" />
        <input type="submit" name="frmIngreso:enviar" value="Enviar" />
        <select name="frmIngreso:tipo"><option value="1">Uno</option><option value="2" selected>Dos</option></select>
        <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="-123:456" />
      </form>
      </body></html>
    "#;

    #[test]
    fn form_fields_follow_browser_rules() {
        let form = Form::by_id(PAGE, "frmIngreso", "test").unwrap();
        assert_eq!(form.id, "frmIngreso");
        assert_eq!(form.get("frmIngreso:txtCedula"), Some(""));
        assert_eq!(form.get("frmIngreso:acepta"), Some("on"));
        assert_eq!(form.get("frmIngreso:otro"), None);
        assert_eq!(form.get("frmIngreso:enviar"), None);
        assert_eq!(form.get("frmIngreso:tipo"), Some("2"));
        assert_eq!(form.view_state(), Some("-123:456"));
    }

    #[test]
    fn action_resolves_against_page() {
        let form = Form::first(PAGE, "test").unwrap();
        let page = Url::parse("http://127.0.0.1:9000/pages/publico/requerimiento.jsf?x=1").unwrap();
        assert_eq!(
            form.action_url(&page).unwrap().as_str(),
            "http://127.0.0.1:9000/pages/publico/requerimiento.jsf"
        );
    }

    #[test]
    fn form_lookup_by_input_suffix() {
        let form = Form::containing_input(PAGE, ":txtCedula", "test").unwrap();
        assert_eq!(form.field_ending(":txtCedula").as_deref(), Some("frmIngreso:txtCedula"));
        assert!(Form::containing_input(PAGE, ":cedcau", "test").is_err());
    }

    #[test]
    fn missing_form_or_view_state_is_markup_error() {
        assert!(matches!(
            Form::by_id(PAGE, "other", "test"),
            Err(LookupError::Markup { .. })
        ));
        let no_token = r#"<form id="f"><input name="a" value="1"/></form>"#;
        assert!(matches!(
            Form::by_id(no_token, "f", "test"),
            Err(LookupError::Markup { .. })
        ));
    }

    #[test]
    fn set_replaces_then_appends() {
        let mut form = Form::first(PAGE, "test").unwrap();
        form.set("frmIngreso:txtCedula", "1710034065");
        form.set("extra", "x");
        assert_eq!(form.get("frmIngreso:txtCedula"), Some("1710034065"));
        assert_eq!(form.pairs().last().unwrap(), &("extra".to_string(), "x".to_string()));
    }

    #[test]
    fn partial_response_updates_and_view_state() {
        let body = r#"<?xml version='1.0' encoding='UTF-8'?>
<partial-response id="j_id1"><changes>
<update id="form:pResultado"><![CDATA[<div>a]]]]><![CDATA[>b</div>]]></update>
<update id="msgs">&lt;span&gt;hola&lt;/span&gt;</update>
<update id="j_id1:javax.faces.ViewState:0"><![CDATA[-999:111]]></update>
</changes></partial-response>"#;
        let partial = PartialResponse::parse(body);
        assert_eq!(partial.update("form:pResultado"), Some("<div>a]]>b</div>"));
        assert_eq!(partial.update("msgs"), Some("<span>hola</span>"));
        assert_eq!(partial.view_state(), Some("-999:111"));
        assert_eq!(partial.fragments().count(), 2);
        assert_eq!(partial.preferred(&["msgs"]), vec!["<span>hola</span>"]);
        assert_eq!(partial.preferred(&["nope"]).len(), 2);

        let mut form = Form::first(PAGE, "test").unwrap();
        form.refresh_view_state(&partial);
        assert_eq!(form.view_state(), Some("-999:111"));
    }

    #[test]
    fn response_markup_passes_full_pages_through() {
        assert_eq!(response_markup("<html>x</html>"), "<html>x</html>");
        let partial = r#"<partial-response><changes><update id="a"><![CDATA[<p>1</p>]]></update></changes></partial-response>"#;
        assert_eq!(response_markup(partial), "<p>1</p>");
    }

    #[test]
    fn ajax_pairs_append_event_parameters() {
        let form = Form::first(PAGE, "test").unwrap();
        let pairs = form.ajax_pairs("frmIngreso:txtCedula", "frmIngreso:txtCedula", "frmIngreso");
        assert!(pairs.contains(&("javax.faces.partial.ajax".into(), "true".into())));
        assert!(pairs.contains(&("javax.faces.source".into(), "frmIngreso:txtCedula".into())));
    }
}
