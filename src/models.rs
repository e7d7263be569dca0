//! Wire models for the commerce backend: auth payloads, catalog records,
//! management records and the shared pagination envelope.

use serde::{Deserialize, Serialize};

// ==============================
// Auth
// ==============================

/// Body of a successful password-grant login.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

/// The signed-in operator, as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub status: Option<RecordStatus>,
    pub avatar_url: Option<String>,
}

// ==============================
// Shared
// ==============================

/// Lifecycle status shared by product and user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
    /// Anything the backend sends that this client does not know yet.
    #[serde(other)]
    Unknown,
}

/// Pagination metadata the backend attaches to list responses.
/// Field names arrive camelCased.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationInfo {
    pub total_elements: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub size: u32,
}

/// List envelope: `{ "data": [...], "pagination_info": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub pagination_info: Option<PaginationInfo>,
}

// ==============================
// Products
// ==============================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i64>,
    pub unit_price: Option<f64>,
    pub low_stock: Option<i64>,
    pub image_url: Option<String>,
    pub status: Option<RecordStatus>,
    pub created_at: Option<String>,
}

/// Payload for bulk product creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl NewProduct {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            description: None,
            stock: None,
            unit_price: None,
            low_stock: None,
            image_url: None,
            status: None,
        }
    }
}

/// Partial product update; only the fields the backend accepts on PUT.
/// `sanitized` drops unset fields and whitespace-only strings so the wire
/// payload never overwrites a value with an accidental blank.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl ProductUpdate {
    pub fn sanitized(mut self) -> Self {
        self.name = drop_blank(self.name);
        self.category = drop_blank(self.category);
        self.description = drop_blank(self.description);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.unit_price.is_none()
            && self.description.is_none()
            && self.low_stock.is_none()
            && self.status.is_none()
    }
}

/// Filters for the product list endpoint. `status` uses the backend's string
/// values; `"all"` (or `None`) leaves the filter off entirely.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            search: None,
            status: None,
        }
    }
}

// ==============================
// Users
// ==============================

/// A managed account as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<RecordStatus>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Registration payload. `normalized` trims the name, lowercases the email
/// and trims the phone; `phone` is sent explicitly (null when absent) while
/// empty `roles` are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            phone: None,
            status: RecordStatus::Active,
            roles: Vec::new(),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone = self.phone.map(|p| p.trim().to_string());
        self
    }
}

/// Partial user update, sanitized the same way as [`ProductUpdate`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn sanitized(mut self) -> Self {
        self.name = drop_blank(self.name);
        self.email = drop_blank(self.email);
        self.phone = drop_blank(self.phone);
        self.password = drop_blank(self.password);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.status.is_none()
            && self.roles.is_none()
            && self.password.is_none()
    }
}

/// Filters for the user list endpoint. Each entry in `roles` becomes its own
/// repeated `roles=` query parameter.
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub status: Option<String>,
    pub roles: Vec<String>,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            search: None,
            status: None,
            roles: Vec::new(),
        }
    }
}

fn drop_blank(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}
