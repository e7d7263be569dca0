//! Product catalog operations used by the management console.

use bytes::Bytes;
use http::Method;

use crate::api_client::{ApiBody, ApiClient, ApiError, RequestCall};
use crate::models::{NewProduct, Paginated, Product, ProductQuery, ProductUpdate};

const AREA: &str = "/product/controller/api/v1";

/// Typed facade over the product endpoints. Cheap to clone; every instance
/// shares the underlying [`ApiClient`].
#[derive(Clone)]
pub struct ProductService {
    api: ApiClient,
}

impl ProductService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Paged catalog listing. Search matches product names; a status of
    /// `"all"` (or none) leaves the filter off.
    pub async fn list(&self, query: &ProductQuery) -> Result<Paginated<Product>, ApiError> {
        let mut params = vec![
            ("page".to_string(), query.page.to_string()),
            ("size".to_string(), query.size.to_string()),
        ];
        if let Some(search) = &query.search {
            let trimmed = search.trim();
            if !trimmed.is_empty() {
                params.push(("name".to_string(), trimmed.to_string()));
            }
        }
        if let Some(status) = &query.status {
            if !status.is_empty() && status != "all" {
                params.push(("status".to_string(), status.clone()));
            }
        }

        let path = format!("{AREA}/products?{}", encode_query(&params));
        self.api
            .call(Method::GET, &path, RequestCall::empty())
            .await?
            .into_json()
    }

    pub async fn get(&self, product_id: &str) -> Result<Product, ApiError> {
        let body = self
            .api
            .call(Method::GET, &item_path(product_id), RequestCall::empty())
            .await?;
        body.into_data()
    }

    /// Bulk creation; the backend expects an array payload even for one
    /// product. Returns the created records.
    pub async fn create(&self, products: &[NewProduct]) -> Result<Vec<Product>, ApiError> {
        if products.is_empty() {
            return Err(ApiError::InvalidRequest(
                "At least one product is required".into(),
            ));
        }
        let payload = serde_json::to_value(products)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let body = self
            .api
            .call(
                Method::POST,
                &format!("{AREA}/products"),
                RequestCall::json(payload),
            )
            .await?;
        body.into_data()
    }

    /// Convenience wrapper for single-product creation.
    pub async fn create_one(&self, product: NewProduct) -> Result<Vec<Product>, ApiError> {
        self.create(std::slice::from_ref(&product)).await
    }

    /// Partial update. The payload is sanitized first so unset fields and
    /// blank strings never reach the wire.
    pub async fn update(
        &self,
        product_id: &str,
        update: ProductUpdate,
    ) -> Result<ApiBody, ApiError> {
        let update = update.sanitized();
        let payload =
            serde_json::to_value(&update).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.api
            .call(Method::PUT, &item_path(product_id), RequestCall::json(payload))
            .await
    }

    pub async fn delete(&self, product_id: &str) -> Result<ApiBody, ApiError> {
        self.api
            .call(Method::DELETE, &item_path(product_id), RequestCall::empty())
            .await
    }

    /// Upload or replace the product image. Multipart field name is `file`.
    pub async fn upload_image(
        &self,
        product_id: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<ApiBody, ApiError> {
        let part = reqwest::multipart::Part::stream(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.api
            .call(
                Method::POST,
                &format!("{}/image", item_path(product_id)),
                RequestCall::multipart(form),
            )
            .await
    }
}

pub(crate) fn item_path_in(area: &str, id: &str) -> String {
    format!("{area}/{}", urlencoding::encode(id))
}

fn item_path(product_id: &str) -> String {
    item_path_in(AREA, product_id)
}

/// Percent-encode values; keys are plain identifiers.
pub(crate) fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
