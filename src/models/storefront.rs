use serde::{Deserialize, Serialize};

// ==================================================================================================
// Login Models
// ==================================================================================================

/// Email/password pair entered by the user; never persisted
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of the legacy `/login` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

// ==================================================================================================
// Customer Models
// ==================================================================================================

/// Basic customer record from `/customer`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: String,
}

/// Loyalty profile from `/api/v3/customer/details`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub is_temp_password_used: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthdate: Option<String>,
    pub email: Option<String>,
    pub mobile_phone: Option<String>,
    pub title: Option<String>,
    pub home_number: Option<String>,
    pub loyalty_number: Option<String>,
    pub created_date: String,
    pub activate_date: Option<String>,
    pub enum_status: i32,
    pub status_name: Option<String>,
    pub signup_channel: Option<String>,
    pub most_shopped_store_id: Option<i64>,
    pub nearest_store_id: Option<i64>,
    pub id: i64,
    pub email_not_provided: Option<bool>,
    pub customer_number: Option<String>,
}

impl CustomerDetails {
    /// First and last name joined, empty when neither is known
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

// ==================================================================================================
// Order Models
// ==================================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub date: String,
    pub total: f64,
    pub status: String,
    pub items: u32,
}

// ==================================================================================================
// Error Body
// ==================================================================================================

/// Error payload the backend returns alongside non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
