use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{CreateStaffRequest, StaffError, StaffMember, UpdateStaffRequest};

pub struct StaffService {
    supabase: SupabaseClient,
}

impl StaffService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_staff(&self, user_id: &str) -> Result<StaffMember, StaffError> {
        debug!("Fetching staff member: {}", user_id);

        let path = format!("/rest/v1/users?user_id=eq.{}", urlencoding::encode(user_id));
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(map_store_error)?;

        let row = result.into_iter().next().ok_or(StaffError::NotFound)?;
        serde_json::from_value(row).map_err(|e| StaffError::DatabaseError(e.to_string()))
    }

    pub async fn list_staff(&self) -> Result<Vec<StaffMember>, StaffError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/users?order=id.desc", None)
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<StaffMember>, _>>()
            .map_err(|e| StaffError::DatabaseError(e.to_string()))
    }

    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<StaffMember, StaffError> {
        if request.fullname.trim().is_empty() || request.username.trim().is_empty() {
            return Err(StaffError::MissingFields);
        }

        // Business key is role-prefixed; generated when the form leaves it blank.
        let user_id = match request.user_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => format!("{}{}", request.role.id_prefix(), Utc::now().timestamp_millis()),
        };

        debug!("Creating staff member {} ({})", user_id, request.role);

        let staff_data = json!({
            "user_id": user_id,
            "fullname": request.fullname,
            "role": request.role,
            "username": request.username,
            "email": request.email,
            "contact": request.contact,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::POST, "/rest/v1/users", Some(staff_data), Some(headers))
            .await
            .map_err(|e| {
                // The users table carries a unique index on username.
                if e.is_conflict() {
                    StaffError::UsernameTaken(request.username.clone())
                } else {
                    map_store_error(e)
                }
            })?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| StaffError::DatabaseError("insert returned no row".to_string()))?;
        let staff: StaffMember =
            serde_json::from_value(row).map_err(|e| StaffError::DatabaseError(e.to_string()))?;

        info!("Staff member {} created", staff.user_id);
        Ok(staff)
    }

    pub async fn update_staff(
        &self,
        id: i64,
        request: UpdateStaffRequest,
    ) -> Result<StaffMember, StaffError> {
        let mut update_data = serde_json::Map::new();
        if let Some(fullname) = request.fullname {
            update_data.insert("fullname".to_string(), json!(fullname));
        }
        if let Some(role) = request.role {
            update_data.insert("role".to_string(), json!(role));
        }
        if let Some(username) = request.username {
            update_data.insert("username".to_string(), json!(username));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(contact) = request.contact {
            update_data.insert("contact".to_string(), json!(contact));
        }

        if update_data.is_empty() {
            return Err(StaffError::MissingFields);
        }

        let path = format!("/rest/v1/users?id=eq.{}", id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(map_store_error)?;

        let row = result.into_iter().next().ok_or(StaffError::NotFound)?;
        serde_json::from_value(row).map_err(|e| StaffError::DatabaseError(e.to_string()))
    }

    pub async fn delete_staff(&self, id: i64) -> Result<(), StaffError> {
        let path = format!("/rest/v1/users?id=eq.{}", id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(headers))
            .await
            .map_err(map_store_error)?;

        if deleted.is_empty() {
            return Err(StaffError::NotFound);
        }

        info!("Staff member {} deleted", id);
        Ok(())
    }
}

fn map_store_error(e: SupabaseError) -> StaffError {
    if e.is_retryable() {
        StaffError::StoreUnavailable(e.to_string())
    } else {
        StaffError::DatabaseError(e.to_string())
    }
}
