//! # Integration Tests for the JSF Portal Modules
//!
//! Drives the SIIRS, IESS, SUPA and invoice-portal flows against wiremock.
//! Each mock matches on the form fields a browser would post, so these
//! tests pin the request shape as well as the parsing of the responses.
//! View-state tokens change on every response and the mocks only answer
//! requests echoing the latest one.

use osint_core::{Cedula, LookupOutcome};
use osint_lookup::comprobantes::InvoiceEmailModule;
use osint_lookup::http::build_client;
use osint_lookup::iess::DeceasedModule;
use osint_lookup::names::NameBackend;
use osint_lookup::siirs::SocialRegistryClient;
use osint_lookup::supa::SupaModule;
use osint_lookup::{LookupConfig, LookupError, LookupModule};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cedula() -> Cedula {
    Cedula::new("1710034065").expect("valid cedula")
}

fn http_and_base(server: &MockServer) -> (reqwest::Client, Url) {
    let config = LookupConfig::local_mock(&server.uri()).expect("mock config");
    let http = build_client(&config).expect("client");
    (http, config.civil_registry_url)
}

fn partial(updates: &[(&str, &str)]) -> String {
    let mut body = String::from(
        "<?xml version='1.0' encoding='UTF-8'?>\n<partial-response id=\"j_id1\"><changes>",
    );
    for (id, content) in updates {
        body.push_str(&format!("<update id=\"{id}\"><![CDATA[{content}]]></update>"));
    }
    body.push_str("</changes></partial-response>");
    body
}

fn xml_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/xml;charset=UTF-8")
        .set_body_string(body)
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/html;charset=UTF-8")
        .set_body_string(body)
}

// ── SIIRS ────────────────────────────────────────────────────────────────

const SIIRS_PAGE: &str = r#"<html><body>
<form id="frmIngreso" name="frmIngreso" method="post" action="/pages/publico/requerimiento.jsf">
  <input type="hidden" name="frmIngreso" value="frmIngreso" />
  <input id="frmIngreso:txtCedula" type="text" name="frmIngreso:txtCedula" value="" />
  <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="s1" />
</form></body></html>"#;

#[tokio::test]
async fn siirs_value_change_returns_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/publico/requerimiento.jsf"))
        .respond_with(html_response(SIIRS_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pages/publico/requerimiento.jsf"))
        .and(header("Faces-Request", "partial/ajax"))
        .and(body_string_contains("frmIngreso%3AtxtCedula=1710034065"))
        .and(body_string_contains("javax.faces.behavior.event=valueChange"))
        .and(body_string_contains("javax.faces.ViewState=s1"))
        .respond_with(xml_response(partial(&[
            (
                "frmIngreso",
                r#"<span id="frmIngreso:lblName">PEREZ LOPEZ JUAN CARLOS</span>"#,
            ),
            ("j_id1:javax.faces.ViewState:0", "s2"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let name = SocialRegistryClient::new(http, base)
        .full_name(&cedula())
        .await
        .expect("lookup");
    assert_eq!(name.as_deref(), Some("PEREZ LOPEZ JUAN CARLOS"));
}

#[tokio::test]
async fn siirs_page_without_form_is_markup_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pages/publico/requerimiento.jsf"))
        .respond_with(html_response("<html><body>Servicio no disponible</body></html>"))
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let err = SocialRegistryClient::new(http, base)
        .full_name(&cedula())
        .await
        .unwrap_err();
    assert!(matches!(err, LookupError::Markup { .. }), "{err}");
}

// ── IESS ─────────────────────────────────────────────────────────────────

const IESS_PATH: &str = "/prjPensionesJubilacion-web/pages/solicitudGenerica/solicitud.jsf";

const IESS_PAGE: &str = r#"<html><body>
<form id="frm" name="frm" method="post" action="/prjPensionesJubilacion-web/pages/solicitudGenerica/solicitud.jsf">
  <input type="hidden" name="frm" value="frm" />
  <input id="frm:cedcau" type="text" name="frm:cedcau" value="" />
  <input type="submit" name="frm:continuar" value="Continuar" />
  <input type="hidden" name="javax.faces.ViewState" value="i1" />
</form></body></html>"#;

async fn mount_iess(server: &MockServer, result_page: &str) {
    Mock::given(method("GET"))
        .and(path(IESS_PATH))
        .respond_with(html_response(IESS_PAGE))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(IESS_PATH))
        .and(body_string_contains("frm%3Acedcau=1710034065"))
        .and(body_string_contains("frm%3Acontinuar=Continuar"))
        .and(body_string_contains("javax.faces.ViewState=i1"))
        .respond_with(html_response(result_page))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn iess_reports_death_date() {
    let server = MockServer::start().await;
    mount_iess(
        &server,
        r#"<html><body><span id="frm:j_idt40:fecFallecimiento">2019-03-07</span></body></html>"#,
    )
    .await;

    let (http, base) = http_and_base(&server);
    let out = DeceasedModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    assert_eq!(out, LookupOutcome::Line("Fallecimiento: 2019-03-07".into()));
}

#[tokio::test]
async fn iess_without_death_date_is_absent() {
    let server = MockServer::start().await;
    mount_iess(
        &server,
        r#"<html><body><span id="frm:j_idt40:fecFallecimiento"></span></body></html>"#,
    )
    .await;

    let (http, base) = http_and_base(&server);
    let out = DeceasedModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    assert!(out.is_absent());
}

// ── SUPA ─────────────────────────────────────────────────────────────────

const SUPA_PATH: &str = "/pensiones/publico/consulta.jsf";

const SUPA_PAGE: &str = r#"<html><body>
<form id="form" name="form" method="post" action="/pensiones/publico/consulta.jsf">
  <input type="hidden" name="form" value="form" />
  <input id="form:t_texto_cedula" type="text" name="form:t_texto_cedula" value="" />
  <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="v1" />
</form></body></html>"#;

const SUPA_RESULTS: &str = r#"<div class="ui-datatable"><div class="ui-datatable-tablewrapper"><table role="grid">
<thead><tr><th>Código</th><th>Proceso</th><th>Dependencia</th><th>Fecha</th><th>Intervinientes</th><th></th></tr></thead>
<tbody id="form:tResultado_data">
<tr data-ri="0" role="row"><td>ABC123</td><td>17203-2015-01234</td><td>UNIDAD JUDICIAL DE FAMILIA QUITO</td><td>2015-02-01</td>
<td><table><tr><td><label>Representante Legal:</label></td><td>MARIA LOPEZ</td></tr>
<tr><td><label>Obligado principal:</label></td><td>JUAN PEREZ</td></tr></table></td>
<td><button id="form:tResultado:0:j_idt60" type="submit">Ver</button></td></tr>
</tbody></table></div></div>"#;

#[tokio::test]
async fn supa_threads_view_state_through_every_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SUPA_PATH))
        .respond_with(html_response(SUPA_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUPA_PATH))
        .and(body_string_contains("form%3Ab_buscar_cedula=form%3Ab_buscar_cedula"))
        .and(body_string_contains("form%3At_texto_cedula=1710034065"))
        .and(body_string_contains("javax.faces.ViewState=v1"))
        .respond_with(xml_response(partial(&[
            ("form:pResultado", SUPA_RESULTS),
            ("j_id1:javax.faces.ViewState:0", "v2"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUPA_PATH))
        .and(body_string_contains("javax.faces.partial.render=form%3AdDetalle"))
        .and(body_string_contains("javax.faces.ViewState=v2"))
        .respond_with(xml_response(partial(&[
            (
                "form:dDetalle",
                r#"<table><tr><td><label>Pensión actual:</label></td><td>$ 245,67</td></tr></table>"#,
            ),
            ("j_id1:javax.faces.ViewState:0", "v3"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUPA_PATH))
        .and(body_string_contains("javax.faces.partial.render=form%3Ad_pendientes"))
        .and(body_string_contains("javax.faces.ViewState=v3"))
        .respond_with(xml_response(partial(&[
            (
                "form:d_pendientes",
                r#"<table><tr><td><label>TOTAL PENDIENTE:</label></td><td><span>1.234,50</span></td></tr></table>"#,
            ),
            ("j_id1:javax.faces.ViewState:0", "v4"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let out = SupaModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    let LookupOutcome::Table(rows) = out else {
        panic!("expected a table, got {out:?}");
    };
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.get("Código tarjeta"), Some("ABC123"));
    assert_eq!(
        row.get("Dependencia jurisdiccional"),
        Some("UNIDAD JUDICIAL DE FAMILIA QUITO")
    );
    assert_eq!(row.get("Representante legal"), Some("MARIA LOPEZ"));
    assert_eq!(row.get("Obligado principal"), Some("JUAN PEREZ"));
    assert_eq!(row.get("Pensión actual"), Some("$ 245,67"));
    assert_eq!(row.get("Total pendiente"), Some("$1,234.50"));
}

#[tokio::test]
async fn supa_without_results_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SUPA_PATH))
        .respond_with(html_response(SUPA_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUPA_PATH))
        .respond_with(xml_response(partial(&[
            ("form:pResultado", "<div>No se encontraron registros</div>"),
            ("j_id1:javax.faces.ViewState:0", "v2"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let out = SupaModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    assert!(out.is_absent());
}

// ── Invoice portal ───────────────────────────────────────────────────────

const INVOICES_PATH: &str = "/portalCiudadano/comprobantes.jsf";

const INVOICES_PAGE: &str = r##"<html><body>
<form id="j_idt107" name="j_idt107" method="post" action="/portalCiudadano/comprobantes.jsf">
  <input type="hidden" name="j_idt107" value="j_idt107" />
  <input id="j_idt107:txtIdentificacion" type="text" name="j_idt107:txtIdentificacion" value="" />
  <a id="j_idt107:j_idt111" href="#" class="ui-commandlink">Buscar</a>
  <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="c1" />
</form></body></html>"##;

const INVOICES_TABLE: &str = r##"<tbody id="j_idt107:tabFacturas_data" class="ui-datatable-data">
<tr data-ri="0" class="ui-widget-content"><td>001-001-000000123</td>
<td><a id="j_idt107:tabFacturas:0:j_idt125" href="#"><img alt="Descargar XML" src="xml.png"/></a></td></tr>
</tbody>"##;

#[tokio::test]
async fn invoice_email_from_first_invoice_xml() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INVOICES_PATH))
        .respond_with(html_response(INVOICES_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_PATH))
        .and(body_string_contains("j_idt107%3Aj_idt111=j_idt107%3Aj_idt111"))
        .and(body_string_contains("j_idt107%3AtxtIdentificacion=1710034065"))
        .and(body_string_contains("javax.faces.ViewState=c1"))
        .respond_with(xml_response(partial(&[
            ("j_idt107", INVOICES_TABLE),
            ("j_id1:javax.faces.ViewState:0", "c2"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_PATH))
        .and(body_string_contains(
            "j_idt107%3AtabFacturas%3A0%3Aj_idt125=j_idt107%3AtabFacturas%3A0%3Aj_idt125",
        ))
        .and(body_string_contains("javax.faces.ViewState=c2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/xml")
                .set_body_string(
                    r#"<factura><infoAdicional><campoAdicional nombre="Email">juan.perez@example.com</campoAdicional></infoAdicional></factura>"#,
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let out = InvoiceEmailModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    assert_eq!(out, LookupOutcome::Line("juan.perez@example.com".into()));
}

#[tokio::test]
async fn invoice_portal_without_invoices_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INVOICES_PATH))
        .respond_with(html_response(INVOICES_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(INVOICES_PATH))
        .respond_with(xml_response(partial(&[(
            "j_idt107",
            r#"<tbody id="j_idt107:tabFacturas_data"><tr class="ui-datatable-empty-message"><td>No se encontraron registros</td></tr></tbody>"#,
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let (http, base) = http_and_base(&server);
    let out = InvoiceEmailModule::new(http, base)
        .search(&cedula())
        .await
        .expect("search");
    assert!(out.is_absent());
}
