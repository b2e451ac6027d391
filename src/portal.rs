// Provisioning portal
// Minimal HTTP form served on the soft-AP so an operator can enter WiFi credentials

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use embedded_svc::http::{Headers, Method};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::server::{Configuration, EspHttpConnection, EspHttpServer, Request};
use log::{info, warn};

use tempreporter_shared::provisioning::{parse_credentials_form, WifiCredentials};

const MAX_FORM_BODY: usize = 512;

const SAVED_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width\"></head><body>\
<p>Sparat. Enheten ansluter nu.</p></body></html>";

pub struct CredentialPortal {
    _server: EspHttpServer<'static>,
    submitted: Arc<Mutex<Option<WifiCredentials>>>,
}

impl CredentialPortal {
    pub fn start(ap_name: &str) -> anyhow::Result<Self> {
        let conf = Configuration {
            stack_size: 10 * 1024,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf)?;
        let submitted = Arc::new(Mutex::new(None));

        let page = form_page(ap_name);
        server.fn_handler::<anyhow::Error, _>("/", Method::Get, move |req| {
            req.into_ok_response()?.write_all(page.as_bytes())?;
            Ok(())
        })?;

        {
            let submitted = submitted.clone();
            server.fn_handler::<anyhow::Error, _>("/save", Method::Post, move |mut req| {
                let body = read_form_body(&mut req)?;
                match parse_credentials_form(&String::from_utf8_lossy(&body)) {
                    Ok(credentials) => {
                        info!("📥 Credentials submitted for SSID: {}", credentials.ssid);
                        *submitted
                            .lock()
                            .map_err(|_| anyhow!("portal state poisoned"))? = Some(credentials);
                        req.into_ok_response()?.write_all(SAVED_PAGE.as_bytes())?;
                    }
                    Err(e) => {
                        warn!("Rejected portal form: {}", e);
                        req.into_status_response(400)?
                            .write_all(format!("Ogiltigt formulär: {}", e).as_bytes())?;
                    }
                }
                Ok(())
            })?;
        }

        info!("🌐 Provisioning portal listening");
        Ok(Self {
            _server: server,
            submitted,
        })
    }

    /// Credentials posted since the last call, if any
    pub fn take_submission(&self) -> Option<WifiCredentials> {
        self.submitted.lock().ok()?.take()
    }
}

fn read_form_body(req: &mut Request<&mut EspHttpConnection<'_>>) -> anyhow::Result<Vec<u8>> {
    let len = req.content_len().unwrap_or(0) as usize;
    if len > MAX_FORM_BODY {
        return Err(anyhow!("form body too large: {} bytes", len));
    }

    let mut body = vec![0u8; len];
    if len > 0 {
        req.read_exact(&mut body)?;
    }
    Ok(body)
}

fn form_page(ap_name: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width\"><title>{name}</title></head><body>\
<h3>{name}</h3>\
<form method=\"post\" action=\"/save\">\
<p><input name=\"ssid\" placeholder=\"SSID\" maxlength=\"32\" required></p>\
<p><input name=\"password\" type=\"password\" placeholder=\"L&ouml;senord\" maxlength=\"64\"></p>\
<p><button type=\"submit\">Spara</button></p>\
</form></body></html>",
        name = escape_html(ap_name)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
