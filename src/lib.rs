#![forbid(unsafe_code)]
#![doc = r#"
Armoire

Client-side session, token and request plumbing for a furniture-commerce
admin console backend.

Crate highlights
- Session lifecycle: bootstrap/login/logout state machine over an OAuth2
  password grant, with the bearer token held in memory only.
- Encrypted persistence: AES-256-GCM token records in per-scope slot storage
  (ephemeral "this session" vs durable "remember me"), single location at a
  time, unusable records collapse to an anonymous start instead of erroring.
- One HTTP chokepoint: every backend call goes through `ApiClient`, which
  attaches the bearer and classifies responses into typed errors.
- Declarative routing: a pure decision function over (path, session state)
  with public/authenticated/role access levels.

Modules
- `config`: ARMOIRE_* environment configuration.
- `storage`: scoped slot stores (filesystem, in-memory).
- `secret_store` / `token_vault`: encryption and token persistence.
- `api_client`: request dispatch, bearer injection, error taxonomy.
- `session`: the authentication state machine.
- `routes`: route table and access decisions.
- `products` / `users`: typed endpoint facades for the console.
- `models`: wire types shared by the above.
"#]

pub mod api_client;
pub mod config;
pub mod models;
pub mod products;
pub mod routes;
pub mod secret_store;
pub mod session;
pub mod storage;
pub mod token_vault;
pub mod users;
pub mod util;

pub use crate::api_client::{ApiBody, ApiClient, ApiError, CurrentToken, RequestBody, RequestCall};
pub use crate::config::ClientConfig;
pub use crate::models::{
    ManagedUser, NewProduct, NewUser, Paginated, PaginationInfo, Product, ProductQuery,
    ProductUpdate, RecordStatus, TokenResponse, UserProfile, UserQuery, UserUpdate,
};
pub use crate::products::ProductService;
pub use crate::routes::{RouteAccess, RouteConfigError, RouteDecision, RouteRule, RouteTable};
pub use crate::secret_store::{DecryptionError, SecretStore, SecretStoreError};
pub use crate::session::{AuthError, SessionManager, SessionState};
pub use crate::storage::{make_store, FsScopeStore, MemoryScopeStore, ScopeStore, StorageScope};
pub use crate::token_vault::TokenVault;
pub use crate::users::UserService;
