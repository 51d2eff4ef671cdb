//! Data access: the four server calls behind the dashboard.
//!
//! Every request goes through an [`HttpClient`] so the same code runs on top of
//! browser `fetch`, reqwest, or a scripted test double. The anti-forgery
//! token is mandatory: a [`DataAccess`] cannot be built without one.

mod http;
mod query;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
mod native;

pub use http::{HttpClient, HttpRequest, HttpResponse, Method};
pub use query::DataQuery;

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub use native::ReqwestClient;

use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;

use crate::error::{DashboardError, Result};
use crate::model::{
    CreateRequest, CreateResponse, DataResponse, DeleteRequest, LocationChoices, LocationType,
    OrderEntry, ThemeType, TimeType, WidgetDescriptor, WidgetId,
};

pub const CREATE_PATH: &str = "/create/user-data-representation";
pub const DELETE_PATH: &str = "/delete/user-data-representation";
pub const ORDER_PATH: &str = "/update/order";

/// Anti-forgery token sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Accept the token read from the page (or configuration).
    ///
    /// An absent or blank value is a deployment error, reported as
    /// `MissingCsrfToken` naming the field that should have carried it.
    pub fn from_value(value: Option<String>, field: &str) -> Result<Self> {
        match value {
            Some(token) if !token.trim().is_empty() => Ok(Self(token.trim().to_string())),
            _ => Err(DashboardError::MissingCsrfToken(field.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of logs.
impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// A freshly created widget: its descriptor plus, for ward/room scope, the
/// options for its location selection.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedWidget {
    pub descriptor: WidgetDescriptor,
    pub choices: Option<LocationChoices>,
}

#[derive(Clone)]
pub struct DataAccess {
    client: Rc<dyn HttpClient>,
    root: String,
    csrf_header: String,
    csrf: CsrfToken,
}

impl fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataAccess")
            .field("root", &self.root)
            .field("csrf_header", &self.csrf_header)
            .finish_non_exhaustive()
    }
}

impl DataAccess {
    pub fn new(
        client: Rc<dyn HttpClient>,
        base_url: &str,
        csrf_header: impl Into<String>,
        csrf: CsrfToken,
    ) -> Self {
        Self {
            client,
            root: base_url.trim_end_matches('/').to_string(),
            csrf_header: csrf_header.into(),
            csrf,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.root, path)
    }

    fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest::new(method, url).header(self.csrf_header.clone(), self.csrf.as_str())
    }

    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        tracing::debug!("{} {}", request.method.as_str(), url);
        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(DashboardError::status(url, response.status));
        }
        Ok(response)
    }

    async fn exchange_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let response = self.exchange(request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// `POST /create/user-data-representation`.
    pub async fn create_widget(
        &self,
        location: LocationType,
        theme: ThemeType,
        time: TimeType,
    ) -> Result<CreatedWidget> {
        let body = serde_json::to_string(&CreateRequest {
            location_type: location,
            theme_type: theme,
            time_type: time,
        })?;
        let request = self
            .request(Method::Post, self.url(CREATE_PATH))
            .json_body(body);
        let response: CreateResponse = self.exchange_json(request).await?;

        let descriptor = WidgetDescriptor::from_creation(
            &response.data_representation,
            &response.user_data_representation,
        );
        let choices = descriptor.location.needs_selection().then(|| LocationChoices {
            options: response.locations.unwrap_or_default(),
            selected: descriptor.selected_location.clone(),
        });

        tracing::debug!(
            "Created widget {} ({}/{}/{})",
            descriptor.id,
            descriptor.location,
            descriptor.theme,
            descriptor.time_mode
        );
        Ok(CreatedWidget {
            descriptor,
            choices,
        })
    }

    /// `DELETE /delete/user-data-representation`.
    pub async fn delete_widget(&self, id: &WidgetId) -> Result<()> {
        if id.is_blank() {
            return Err(DashboardError::InvalidArgument(
                "cannot delete a widget without an identifier".to_string(),
            ));
        }
        let body = serde_json::to_string(&DeleteRequest { id: id.clone() })?;
        let request = self
            .request(Method::Delete, self.url(DELETE_PATH))
            .json_body(body);
        self.exchange(request).await?;
        Ok(())
    }

    /// `GET /get_data/{L}/{T}/{Ti}/` for a JSON payload.
    pub async fn fetch_widget_data(&self, query: &DataQuery) -> Result<DataResponse> {
        if query.download {
            return Err(DashboardError::InvalidArgument(format!(
                "download query for widget {} is a navigation target, not data",
                query.id
            )));
        }
        let request = self.request(Method::Get, query.url(&self.root));
        self.exchange_json(request).await
    }

    /// URL that serves the widget's data as a CSV attachment.
    pub fn download_url(&self, descriptor: &WidgetDescriptor) -> Result<String> {
        Ok(DataQuery::for_descriptor(descriptor, false, true)?.url(&self.root))
    }

    /// `PUT /update/order`. Failures go to `on_error` and are never returned.
    pub async fn update_order_or_else<F>(&self, entries: &[OrderEntry], on_error: F)
    where
        F: FnOnce(DashboardError),
    {
        if let Err(e) = self.update_order(entries).await {
            on_error(e);
        }
    }

    async fn update_order(&self, entries: &[OrderEntry]) -> Result<()> {
        let body = serde_json::to_string(entries)?;
        let request = self
            .request(Method::Put, self.url(ORDER_PATH))
            .json_body(body);
        self.exchange(request).await?;
        Ok(())
    }
}
