use serde::{Deserialize, Serialize};

/// !model "A pet in the store"
/// !field name "Name of the pet" example="Rex"
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    /// Unique identifier
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// !field birthDate "Day of birth"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<chrono::NaiveDate>,
    #[serde(skip)]
    pub owner_secret: String,
}

/// Payload for creating a pet.
///
/// !model
#[derive(Debug, Deserialize)]
pub struct NewPet {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// !model "Error payload"
#[derive(Debug, Serialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

/// Query string of `listPets`, never documented as a model.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}
