//! `fetch`-backed [`HttpClient`].

use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

use crate::api::{HttpClient, HttpRequest, HttpResponse};
use crate::error::{DashboardError, Result};

pub struct FetchClient;

#[async_trait(?Send)]
impl HttpClient for FetchClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let failed = |e: JsValue| DashboardError::network(url, format!("{:?}", e));

        let window = web_sys::window().ok_or_else(|| DashboardError::network(url, "no window"))?;

        let headers = Headers::new().map_err(failed)?;
        for (name, value) in &request.headers {
            headers.set(name, value).map_err(failed)?;
        }

        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        opts.set_headers(&headers);
        if let Some(body) = &request.body {
            opts.set_body(&JsValue::from_str(body));
        }

        let js_request = Request::new_with_str_and_init(url, &opts).map_err(failed)?;

        let resp_value = JsFuture::from(window.fetch_with_request(&js_request))
            .await
            .map_err(failed)?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| DashboardError::network(url, "not a Response"))?;

        let status = resp.status();
        let text = JsFuture::from(resp.text().map_err(failed)?)
            .await
            .map_err(failed)?;

        Ok(HttpResponse {
            status,
            body: text.as_string().unwrap_or_default(),
        })
    }
}
