//! Pet store service.
//!
//! !api 3.0.3
//! !info "Pet Store" v1.0.0 "Sample pet store API"
//! !contact "API Support" <support@petstore.test> https://petstore.test/support
//! !license "Apache 2.0" https://www.apache.org/licenses/LICENSE-2.0.html
//! !server https://petstore.test/v1 "Production"
//! !tag pets "Everything about your pets"
//! !link "Source code" https://github.test/petstore
//! !security api_key apiKey header X-API-Key
//! !security petstore_auth oauth2 implicit https://petstore.test/oauth/dialog
//! !scope petstore_auth write:pets "Modify pets in your account"
//! !scope petstore_auth read:pets "Read your pets"

use axum::extract::{Json, Path, Query};

/// Lists all pets.
///
/// !GET /pets -> listPets "List all pets" #pets
/// !query limit:integer "How many items to return" default=20
/// !ok []Pet "A paged array of pets"
/// !error Error "Unexpected error"
pub async fn list_pets(Query(query): Query<ListQuery>) -> Json<Vec<Pet>> {
    Json(Vec::new())
}

/// !POST /pets -> createPet "Create a pet" #pets
/// !body NewPet "Pet to add" required
/// !ok 201 Pet "Created"
/// !error 400 - "Invalid input"
/// !secure petstore_auth
pub async fn create_pet(Json(pet): Json<NewPet>) -> Json<Pet> {
    unimplemented!()
}

/// !GET /pets/{petId} -> showPetById "Info for a specific pet" #pets
/// !path petId:int64 "The id of the pet to retrieve"
/// !ok Pet "Expected response to a valid request"
/// !error 404 none "Pet not found"
/// !secure api_key
pub async fn show_pet_by_id(Path(pet_id): Path<i64>) -> Json<Pet> {
    unimplemented!()
}

/// Not exposed over HTTP.
pub fn internal_helper() {}
