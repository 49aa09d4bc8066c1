//! EDSM endpoint URLs.
//!
//! Two endpoints are used:
//!   - `GET /api-v1/system?systemName=..&showCoordinates=1`
//!   - `GET /api-v1/sphere-systems?x=..&y=..&z=..&radius=..&showCoordinates=1&showId=1&showDistance=1&showPrimaryStar=1`

use url::Url;

use crate::core::model::Coordinates;
use crate::error::{Result, StarfinderError};

pub const SYSTEM_PATH: &str = "api-v1/system";
pub const SPHERE_PATH: &str = "api-v1/sphere-systems";

/// Builds request URLs against a configurable EDSM base
#[derive(Debug, Clone, PartialEq)]
pub struct EdsmEndpoints {
    base: Url,
}

impl EdsmEndpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|e| {
            StarfinderError::Config(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// System lookup URL for `name`
    pub fn system_url(&self, name: &str) -> Result<String> {
        let mut url = self.join(SYSTEM_PATH)?;
        url.query_pairs_mut()
            .append_pair("systemName", name)
            .append_pair("showCoordinates", "1");
        Ok(url.into())
    }

    /// Sphere query URL around `coords`
    pub fn sphere_url(&self, coords: &Coordinates, radius: f64) -> Result<String> {
        let mut url = self.join(SPHERE_PATH)?;
        url.query_pairs_mut()
            .append_pair("x", &coords.x.to_string())
            .append_pair("y", &coords.y.to_string())
            .append_pair("z", &coords.z.to_string())
            .append_pair("radius", &format_radius(radius))
            .append_pair("showCoordinates", "1")
            .append_pair("showId", "1")
            .append_pair("showDistance", "1")
            .append_pair("showPrimaryStar", "1");
        Ok(url.into())
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| StarfinderError::Config(format!("Invalid endpoint path {}: {}", path, e)))
    }
}

impl Default for EdsmEndpoints {
    fn default() -> Self {
        Self {
            base: Url::parse("https://www.edsm.net/").expect("static URL is valid"),
        }
    }
}

/// Render a radius without a trailing `.0` for whole numbers (10.0 -> "10")
pub fn format_radius(radius: f64) -> String {
    if radius.fract() == 0.0 && radius.abs() < 1e15 {
        format!("{}", radius as i64)
    } else {
        format!("{}", radius)
    }
}
