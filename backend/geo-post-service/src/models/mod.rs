/// Data models for geo-post-service
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PostError;

/// Mean earth radius used by Elasticsearch's arc distance, in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.7714;

/// Largest meaningful radius: half the earth's circumference.
const MAX_RADIUS_METERS: f64 = std::f64::consts::PI * EARTH_RADIUS_METERS;

/// A location-tagged post as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user: String,
    pub message: String,
    pub location: Location,
    pub url: String,
}

/// Indexed representation of a post. The post id is the document key, not a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDocument {
    pub user: String,
    pub message: String,
    pub location: Location,
    pub url: String,
}

impl From<&Post> for PostDocument {
    fn from(post: &Post) -> Self {
        Self {
            user: post.user.clone(),
            message: post.message.clone(),
            location: post.location,
            url: post.url.clone(),
        }
    }
}

impl PostDocument {
    pub fn into_post(self, id: Uuid) -> Post {
        Post {
            id,
            user: self.user,
            message: self.message,
            location: self.location,
            url: self.url,
        }
    }
}

/// Geo-point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// Build a location, rejecting values outside lat [-90, 90] / lon [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, PostError> {
        let location = Self { lat, lon };
        if !location.is_valid() {
            return Err(PostError::InvalidCoordinates(format!(
                "coordinates out of range: lat={lat}, lon={lon}"
            )));
        }
        Ok(location)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Search radius. Parsed from `<number><unit>` with unit `km`, `m` or `mi`;
/// a bare number is kilometres. Capped at half the earth's circumference.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance {
    meters: f64,
}

impl Distance {
    pub const DEFAULT_RADIUS: &'static str = "200km";

    pub fn from_meters(meters: f64) -> Self {
        Self { meters }
    }

    pub fn from_km(km: f64) -> Self {
        Self { meters: km * 1000.0 }
    }

    pub fn meters(&self) -> f64 {
        self.meters
    }

    /// Distance string in the form the geo index expects (`"1500m"`).
    pub fn to_query_string(&self) -> String {
        format!("{}m", self.meters)
    }
}

impl FromStr for Distance {
    type Err = PostError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim().to_ascii_lowercase();
        let (number, factor) = if let Some(n) = trimmed.strip_suffix("km") {
            (n, 1000.0)
        } else if let Some(n) = trimmed.strip_suffix("mi") {
            (n, 1609.344)
        } else if let Some(n) = trimmed.strip_suffix('m') {
            (n, 1.0)
        } else {
            (trimmed.as_str(), 1000.0)
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| PostError::InvalidRadius(format!("invalid radius: {raw:?}")))?;

        if !value.is_finite() || value < 0.0 {
            return Err(PostError::InvalidRadius(format!("invalid radius: {raw:?}")));
        }

        let meters = value * factor;
        if meters > MAX_RADIUS_METERS {
            return Err(PostError::InvalidRadius(format!(
                "radius {raw:?} exceeds {}km",
                (MAX_RADIUS_METERS / 1000.0).floor()
            )));
        }

        Ok(Self::from_meters(meters))
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

/// How malformed coordinate input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatePolicy {
    /// Malformed lat/lon is a validation error.
    #[default]
    Strict,
    /// Malformed lat/lon becomes `0.0`. Out-of-range values are still rejected.
    Lenient,
}

impl CoordinatePolicy {
    pub fn parse_coordinate(&self, field: &str, raw: &str) -> Result<f64, PostError> {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => match self {
                CoordinatePolicy::Strict => Err(PostError::InvalidCoordinates(format!(
                    "{field} must be a decimal number, got {raw:?}"
                ))),
                CoordinatePolicy::Lenient => {
                    tracing::debug!(field, raw, "coercing malformed coordinate to 0.0");
                    Ok(0.0)
                }
            },
        }
    }

    pub fn parse_location(&self, lat: &str, lon: &str) -> Result<Location, PostError> {
        let lat = self.parse_coordinate("lat", lat)?;
        let lon = self.parse_coordinate("lon", lon)?;
        Location::new(lat, lon)
    }
}

impl FromStr for CoordinatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CoordinatePolicy::Strict),
            "lenient" => Ok(CoordinatePolicy::Lenient),
            other => Err(format!("unknown coordinate policy: {other}")),
        }
    }
}

/// Post fields exactly as received from the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct RawPost {
    pub user: String,
    pub message: String,
    pub lat: String,
    pub lon: String,
}

/// Image payload attached to a post.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(data: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            data: data.into(),
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
