use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type PlaceId = i64;
pub type ObjectId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
}

/// Row as shown in the admin listing: registration joined with its place name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct ObjectSummary {
    pub id: ObjectId,
    pub client_name: String,
    pub car_number: String,
    pub place_name: String,
}

/// Client / car search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct SearchHit {
    pub client_name: String,
    pub car_number: String,
    pub place_name: String,
    pub image_path: Option<String>,
}

/// Place search result; the place name is the search key and is not repeated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct PlaceHit {
    pub client_name: String,
    pub car_number: String,
    pub image_path: Option<String>,
}

/// Values for a new `objects` row. Field checks happen in the registry.
#[derive(Debug, Clone)]
pub struct NewObject {
    pub client_name: String,
    pub car_number: String,
    pub place_id: PlaceId,
    pub image_path: Option<String>,
}
