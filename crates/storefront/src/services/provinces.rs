//! Province and commune data for address forms and shipping quotes.
//!
//! The data ships as a local JSON file (`MARKETPLACE_PROVINCES_FILE`) shaped
//! `{ "province": [...], "commune": [...] }`. Field names vary between
//! exports, so both lists are read through aliases.

use marketplace_core::shipping::{self, Region, ShippingQuote};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Province {
    pub code: String,
    pub name: String,
}

impl Province {
    #[must_use]
    pub fn region(&self) -> Option<Region> {
        shipping::region_of(&self.name)
    }
}

/// A commune (ward). The data has no district level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    pub code: String,
    pub name: String,
    pub province_code: String,
}

fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match item.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn list<'a>(data: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|k| data.get(*k).and_then(Value::as_array))
        .map_or(&[], Vec::as_slice)
}

/// Loaded province and commune lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvinceDirectory {
    provinces: Vec<Province>,
    wards: Vec<Ward>,
}

impl ProvinceDirectory {
    /// Read the JSON export. A bare array is taken as the province list.
    #[must_use]
    pub fn from_json(data: &Value) -> Self {
        let provinces = match data {
            Value::Array(items) => items.as_slice(),
            _ => list(data, &["province", "provinces"]),
        };
        let provinces = provinces
            .iter()
            .filter_map(|p| {
                Some(Province {
                    code: text(p, &["idProvince", "code", "id"])?,
                    name: text(p, &["name", "provinceName", "province"])?,
                })
            })
            .collect();

        let wards = list(data, &["commune", "communes"])
            .iter()
            .filter_map(|c| {
                Some(Ward {
                    code: text(c, &["idCommune", "code", "id"])?,
                    name: text(c, &["name", "communeName", "commune"])?,
                    province_code: text(c, &["idProvince", "provinceCode"])?,
                })
            })
            .collect();

        Self { provinces, wards }
    }

    #[must_use]
    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    /// Communes of a province.
    pub fn wards_of<'a>(&'a self, province_code: &'a str) -> impl Iterator<Item = &'a Ward> + 'a {
        self.wards
            .iter()
            .filter(move |w| w.province_code == province_code)
    }

    /// Look up a province by code or (case-insensitive) name.
    #[must_use]
    pub fn find(&self, code_or_name: &str) -> Option<&Province> {
        let needle = code_or_name.trim();
        self.provinces.iter().find(|p| p.code == needle).or_else(|| {
            let needle = needle.to_lowercase();
            self.provinces
                .iter()
                .find(|p| p.name.to_lowercase() == needle)
        })
    }

    /// Province name for a code, or the input unchanged when it is not a
    /// known code.
    #[must_use]
    pub fn name_of<'a>(&'a self, code_or_name: &'a str) -> &'a str {
        self.find(code_or_name)
            .map_or(code_or_name.trim(), |p| p.name.as_str())
    }

    /// Shipping quote between two provinces given by code or name.
    #[must_use]
    pub fn quote(&self, from: &str, to: &str, weight_kg: Decimal) -> ShippingQuote {
        shipping::estimate(Some(self.name_of(from)), Some(self.name_of(to)), weight_kg)
    }
}

impl ApiClient {
    /// Province and commune data from the configured file, cached.
    ///
    /// # Errors
    ///
    /// `ApiError::Validation` when no file is configured, `ApiError::Io` or
    /// `ApiError::Parse` when it cannot be read.
    #[instrument(skip(self))]
    pub async fn province_directory(&self) -> Result<ProvinceDirectory, ApiError> {
        let path = self.config().provinces_file.clone().ok_or_else(|| {
            ApiError::Validation("MARKETPLACE_PROVINCES_FILE chưa được cấu hình".to_owned())
        })?;
        let data = self
            .cached_value("provinces", async {
                let bytes = tokio::fs::read(&path).await?;
                let data: Value = serde_json::from_slice(&bytes)?;
                info!(path = %path.display(), "Loaded province data");
                Ok(data)
            })
            .await?;
        Ok(ProvinceDirectory::from_json(&data))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use marketplace_core::shipping::ShippingTier;
    use serde_json::json;

    fn directory() -> ProvinceDirectory {
        ProvinceDirectory::from_json(&json!({
            "province": [
                {"idProvince": "01", "name": "Thành phố Hà Nội"},
                {"code": 79, "provinceName": "Hồ Chí Minh"},
                {"id": "48", "province": "Đà Nẵng"},
                {"name": "no code"}
            ],
            "commune": [
                {"idProvince": "01", "idCommune": "00004", "name": "Phường Ba Đình"},
                {"provinceCode": "79", "code": "26734", "communeName": "Phường Bến Thành"},
                {"idProvince": "01", "name": "missing code"}
            ]
        }))
    }

    #[test]
    fn test_reads_aliased_fields() {
        let dir = directory();
        assert_eq!(dir.provinces().len(), 3);
        assert_eq!(dir.find("79").unwrap().name, "Hồ Chí Minh");
        assert_eq!(dir.find("đà nẵng").unwrap().code, "48");
        let wards: Vec<_> = dir.wards_of("01").map(|w| w.name.as_str()).collect();
        assert_eq!(wards, ["Phường Ba Đình"]);
        assert_eq!(dir.wards_of("79").count(), 1);
    }

    #[test]
    fn test_bare_array_is_province_list() {
        let dir = ProvinceDirectory::from_json(&json!([{"code": "01", "name": "Hà Nội"}]));
        assert_eq!(dir.provinces().len(), 1);
        assert_eq!(dir.wards_of("01").count(), 0);
    }

    #[test]
    fn test_quote_by_code_and_name() {
        let dir = directory();
        let quote = dir.quote("01", "Thành phố Hà Nội", Decimal::ONE);
        assert_eq!(quote.tier, ShippingTier::SameProvince);
        let quote = dir.quote("01", "79", Decimal::ONE);
        assert_eq!(quote.tier, ShippingTier::FarRegion);
        assert_eq!(dir.name_of("unknown"), "unknown");
    }
}
