//! Video category listing.

use axum::Json;
use serde_json::{json, Value};

use clipcut_models::VideoCategory;

pub async fn get_video_categories() -> Json<Value> {
    let categories: Vec<_> = VideoCategory::ALL.iter().map(|c| c.info()).collect();
    Json(json!({
        "categories": categories,
        "default_category": VideoCategory::default().as_str(),
    }))
}
