//! HTTP REST API endpoints.
//!
//! Implements the game's REST API using Axum.
//!
//! # API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/auth/register` | POST | Register an account |
//! | `/auth/register-admin` | POST | Register an administrator |
//! | `/auth/login` | POST | Exchange credentials for tokens |
//! | `/auth/refresh` | POST | Refresh a token pair |
//! | `/users/me` | GET | Caller's own account |
//! | `/users` | GET | List accounts (admin) |
//! | `/users/{user_id}` | GET/PUT/DELETE | Account management |
//! | `/planets` | POST/GET | Discover and list planets |
//! | `/planets/{planet_id}` | GET/PUT/DELETE | Planet management |
//! | `/planets/{planet_id}/claim` | PUT | Claim a foreign planet |
//! | `/buildings` | POST/GET | Construct and list planet buildings |
//! | `/buildings/{building_id}` | GET/PUT/DELETE | Building management |
//! | `/user-buildings` | POST/GET | User building CRUD |
//! | `/user-buildings/{id}` | GET/PUT/DELETE | User building management |
//! | `/user-fleets` | POST/GET | Station and list fleets |
//! | `/user-fleets/{fleet_id}` | GET/PUT/DELETE | Fleet management |
//! | `/battles` | POST | Resolve a fleet battle |

pub mod extract;
pub mod routes;
pub mod state;

pub use extract::CurrentUser;
pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability,
    create_router_with_observability_and_limit, ApiError, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
