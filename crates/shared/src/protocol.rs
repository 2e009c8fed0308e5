use serde::{Deserialize, Serialize};

use serde_json::Value;

use crate::domain::{Session, UserId, UserRecord};

/// Body of `PUT /usuarios/{id}`. Always carries every field, changed or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
}

impl From<&UserRecord> for RecordUpdate {
    fn from(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
        }
    }
}

/// Body of `POST /crear_usuario`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    pub password: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "correo")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub usuario: Session,
}

/// Registration may answer with the created record, a partial record, or a
/// bare success. The status decides the outcome; the body is informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usuario: Option<Value>,
}

impl RegistrationResponse {
    /// Id of the created user, when the registry echoed one.
    pub fn created_id(&self) -> Option<UserId> {
        self.usuario
            .as_ref()
            .and_then(|usuario| usuario.get("id"))
            .and_then(Value::as_i64)
            .map(UserId)
    }
}
