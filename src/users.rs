//! Account management operations used by the admin console.

use bytes::Bytes;
use http::Method;

use crate::api_client::{ApiBody, ApiClient, ApiError, RequestCall};
use crate::models::{ManagedUser, NewUser, Paginated, UserQuery, UserUpdate};
use crate::products::{encode_query, item_path_in};

const AREA: &str = "/user/controller/api/v1";
const REGISTER_PATH: &str = "/auth/controller/api/v1/register";

/// Typed facade over the user management endpoints.
#[derive(Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Paged account listing. Search matches name/email/phone on the backend;
    /// each role filter becomes its own repeated `roles=` parameter.
    pub async fn list(&self, query: &UserQuery) -> Result<Paginated<ManagedUser>, ApiError> {
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
        for role in query.roles.iter().filter(|r| !r.is_empty()) {
            params.push(("roles".to_string(), role.clone()));
        }

        let path = format!("{AREA}/users?{}", encode_query(&params));
        self.api
            .call(Method::GET, &path, RequestCall::empty())
            .await?
            .into_json()
    }

    /// Create an account. The payload is normalized first (trimmed name,
    /// lowercased email). Registration lives under the auth area.
    pub async fn register(&self, user: NewUser) -> Result<ManagedUser, ApiError> {
        let user = user.normalized();
        let payload =
            serde_json::to_value(&user).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let body = self
            .api
            .call(Method::POST, REGISTER_PATH, RequestCall::json(payload))
            .await?;
        body.into_data()
    }

    /// Partial update, sanitized so blank strings never overwrite a value.
    pub async fn update(&self, user_id: &str, update: UserUpdate) -> Result<ApiBody, ApiError> {
        let update = update.sanitized();
        let payload =
            serde_json::to_value(&update).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.api
            .call(Method::PUT, &item_path(user_id), RequestCall::json(payload))
            .await
    }

    pub async fn delete(&self, user_id: &str) -> Result<ApiBody, ApiError> {
        self.api
            .call(Method::DELETE, &item_path(user_id), RequestCall::empty())
            .await
    }

    /// Upload or replace the account avatar. Multipart field name is `file`.
    pub async fn upload_avatar(
        &self,
        user_id: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<ApiBody, ApiError> {
        let part = reqwest::multipart::Part::stream(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.api
            .call(
                Method::POST,
                &format!("{}/avatar", item_path(user_id)),
                RequestCall::multipart(form),
            )
            .await
    }
}

fn item_path(user_id: &str) -> String {
    item_path_in(AREA, user_id)
}
