use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::{ObjectId, ObjectSummary, Place, PlaceId};
use crate::error::ValidationError;
use crate::middleware::auth::RequireAdmin;
use crate::service::image_store::ImageUpload;
use crate::service::registry::NewRegistration;
use crate::{LotError, router::LotState};

#[derive(Debug, Deserialize)]
pub struct AddPlaceRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarNumberRequest {
    pub car_number: String,
}

/// GET /api/places -> all places by name.
pub async fn list_places(State(state): State<LotState>) -> Result<Json<Vec<Place>>, LotError> {
    Ok(Json(state.registry.list_places().await?))
}

/// POST /api/places -> insert-or-get; repeating a name returns the same id.
pub async fn add_place(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    Json(req): Json<AddPlaceRequest>,
) -> Result<impl IntoResponse, LotError> {
    let id = state.registry.add_place(&token, &req.name).await?;
    let place = Place {
        id,
        name: req.name.trim().to_string(),
    };
    Ok((StatusCode::CREATED, Json(place)))
}

/// DELETE /api/places/{id} -> 409 while registrations still point at the place.
pub async fn delete_place(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    Path(id): Path<PlaceId>,
) -> Result<StatusCode, LotError> {
    if state.registry.delete_place(&token, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(LotError::PlaceInUse)
    }
}

/// GET /api/objects -> every registration with its place, by client name.
pub async fn list_objects(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
) -> Result<Json<Vec<ObjectSummary>>, LotError> {
    Ok(Json(state.registry.list_objects(&token).await?))
}

/// POST /api/objects (multipart) -> new registration.
///
/// Fields: `client_name`, `car_number`, `place_name`, optional `image` file.
pub async fn create_object(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse, LotError> {
    let reg = read_registration(multipart).await?;
    let id = state.registry.register(&token, reg).await?;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

/// PATCH /api/objects/{id} -> replace the car number.
pub async fn update_car_number(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    Path(id): Path<ObjectId>,
    Json(req): Json<UpdateCarNumberRequest>,
) -> Result<StatusCode, LotError> {
    state
        .registry
        .update_car_number(&token, id, &req.car_number)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/objects/{id}
pub async fn delete_object(
    State(state): State<LotState>,
    RequireAdmin(token): RequireAdmin,
    Path(id): Path<ObjectId>,
) -> Result<StatusCode, LotError> {
    state.registry.delete_object(&token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_registration(mut multipart: Multipart) -> Result<NewRegistration, LotError> {
    let mut reg = NewRegistration {
        client_name: String::new(),
        car_number: String::new(),
        place_name: String::new(),
        image: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "client_name" => reg.client_name = field.text().await.map_err(malformed)?,
            "car_number" => reg.car_number = field.text().await.map_err(malformed)?,
            "place_name" => reg.place_name = field.text().await.map_err(malformed)?,
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                // browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    reg.image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(reg)
}

fn malformed(e: MultipartError) -> LotError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        LotError::PayloadTooLarge(e.body_text())
    } else {
        ValidationError::MalformedUpload(e.body_text()).into()
    }
}
