//! City catalogue behind the interactive map.
use explore_domain::catalog::{CITIES, City, LatLng, MAP_CENTER, MAP_ZOOM, find_city};
use salvo::prelude::*;
use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub(crate) struct CityCatalog {
    center: LatLng,
    zoom: u8,
    cities: &'static [City],
}

#[handler]
pub(crate) async fn cities() -> Json<CityCatalog> {
    Json(CityCatalog {
        center: MAP_CENTER,
        zoom: MAP_ZOOM,
        cities: CITIES,
    })
}

/// One city by slug or name.
#[handler]
pub(crate) async fn city(req: &mut Request) -> AppResult<Json<&'static City>> {
    let key = req.param::<String>("city").unwrap_or_default();
    find_city(&key).map(Json).ok_or(AppError::NotFound("City"))
}
