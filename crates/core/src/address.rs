//! Buyer shipping addresses.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AddressId, Phone, PhoneError};

/// Longest text the backend stores for any address field.
pub const MAX_FIELD_LEN: usize = 255;

/// A saved buyer address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default, alias = "street")]
    pub home_address: String,
    #[serde(default)]
    pub suggested_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, alias = "default")]
    pub is_default: bool,
}

/// An address field, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressField {
    Province,
    Ward,
    HomeAddress,
    SuggestedName,
    Phone,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Province => "Tỉnh/Thành phố",
            Self::Ward => "Phường/Xã",
            Self::HomeAddress => "Số nhà, tên đường",
            Self::SuggestedName => "Tên gợi ý",
            Self::Phone => "Số điện thoại",
        })
    }
}

/// A single address problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Vui lòng nhập {0}")]
    Required(AddressField),

    #[error("{0} quá dài (tối đa 255 ký tự)")]
    TooLong(AddressField),

    #[error(transparent)]
    Phone(#[from] PhoneError),
}

/// Every problem found in an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.0))]
pub struct AddressErrors(pub Vec<AddressError>);

fn join_messages(errors: &[AddressError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AddressErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, AddressError> {
        self.0.iter()
    }
}

impl Address {
    /// Validate before sending to the backend.
    ///
    /// # Errors
    ///
    /// Returns all problems at once: missing required fields, an invalid
    /// phone number, and fields longer than [`MAX_FIELD_LEN`].
    pub fn validate(&self) -> Result<(), AddressErrors> {
        let mut errors = Vec::new();

        for (field, value) in [
            (AddressField::Province, &self.province),
            (AddressField::Ward, &self.ward),
            (AddressField::HomeAddress, &self.home_address),
        ] {
            if value.trim().is_empty() {
                errors.push(AddressError::Required(field));
            }
        }

        if let Err(e) = Phone::parse(&self.phone) {
            errors.push(e.into());
        }

        for (field, value) in [
            (AddressField::Province, &self.province),
            (AddressField::Ward, &self.ward),
            (AddressField::HomeAddress, &self.home_address),
            (AddressField::SuggestedName, &self.suggested_name),
        ] {
            if value.chars().count() > MAX_FIELD_LEN {
                errors.push(AddressError::TooLong(field));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AddressErrors(errors))
        }
    }

    /// `home address, ward, province`, skipping empty parts.
    #[must_use]
    pub fn full_line(&self) -> String {
        [&self.home_address, &self.ward, &self.province]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_line())
    }
}

/// The default address, or the first one when none is flagged.
#[must_use]
pub fn pick_default(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
}

/// Body for creating or updating an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub province: String,
    pub ward: String,
    pub home_address: String,
    pub suggested_name: String,
    pub phone: String,
    pub is_default: bool,
}

impl From<&Address> for AddressPayload {
    fn from(a: &Address) -> Self {
        Self {
            province: a.province.trim().to_owned(),
            ward: a.ward.trim().to_owned(),
            home_address: a.home_address.trim().to_owned(),
            suggested_name: a.suggested_name.trim().to_owned(),
            phone: a.phone.trim().to_owned(),
            is_default: a.is_default,
        }
    }
}

/// The address block of an order request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShippingAddress {
    pub province: String,
    pub ward: String,
    pub home_address: String,
    pub phone: String,
    pub suggested_name: String,
}

impl ShippingAddress {
    /// Build from a saved address, falling back to the customer's own phone.
    ///
    /// Returns `None` when neither the address nor the customer has a phone.
    #[must_use]
    pub fn from_address(address: &Address, customer_phone: Option<&str>) -> Option<Self> {
        let phone = Some(address.phone.trim())
            .filter(|p| !p.is_empty())
            .or_else(|| customer_phone.map(str::trim).filter(|p| !p.is_empty()))?;
        Some(Self {
            province: address.province.clone(),
            ward: address.ward.clone(),
            home_address: address.home_address.clone(),
            phone: phone.to_owned(),
            suggested_name: address.suggested_name.clone(),
        })
    }
}
