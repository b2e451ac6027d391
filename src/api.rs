use anyhow::Result;
use embedded_svc::http::client::Client;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use log::{debug, error, warn};
use std::time::Duration;

use tempreporter_shared::reporting::{HttpResponse, HttpTransport};

const BUFFER_SIZE: usize = 1024;
/// Upload replies are a few bytes; anything past this is dropped
const MAX_BODY_LEN: usize = 4096;

/// Blocking HTTP GET over the ESP-IDF client
pub struct EspHttpTransport {
    timeout: Duration,
}

impl EspHttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fresh connection per request; uploads are minutes apart
    fn connection(&self) -> Result<EspHttpConnection> {
        let http_config = Configuration {
            timeout: Some(self.timeout),
            buffer_size: Some(BUFFER_SIZE),
            buffer_size_tx: Some(BUFFER_SIZE),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };

        Ok(EspHttpConnection::new(&http_config)?)
    }
}

impl HttpTransport for EspHttpTransport {
    fn get(&mut self, url: &str) -> Result<HttpResponse> {
        debug!("GET {}", url);
        let mut client = Client::wrap(self.connection()?);
        let request = client.get(url)?;
        let mut response = request.submit()?;
        let status = response.status();
        debug!("Response status: {}", status);

        let mut buffer = [0u8; 256];
        let mut body = Vec::new();
        loop {
            match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(bytes_read) => {
                    body.extend_from_slice(&buffer[..bytes_read]);
                    if body.len() > MAX_BODY_LEN {
                        warn!("Response body too large, truncating at {} bytes", MAX_BODY_LEN);
                        body.truncate(MAX_BODY_LEN);
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading response body: {:?}", e);
                    break;
                }
            }
        }

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
