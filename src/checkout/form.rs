//! Checkout form data and partial updates to it.

use serde::{Deserialize, Serialize};

use super::methods::{DeliveryMethodId, PaymentMethodId, ShopId};
use crate::model::{Address, ContactDetails};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormData {
    pub contact: ContactDetails,
    pub address: Address,
    pub delivery_method_id: Option<DeliveryMethodId>,
    /// Pickup point, only meaningful with a pickup delivery method.
    pub shop_id: Option<ShopId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub comment: Option<String>,
}

impl FormData {
    pub fn city(&self) -> Option<&str> {
        Some(self.address.city.trim()).filter(|city| !city.is_empty())
    }

    /// Merges `patch` in. Returns whether the city changed.
    pub fn apply(&mut self, patch: FormPatch) -> bool {
        let previous_city = self.address.city.clone();

        if let Some(name) = patch.name {
            self.contact.name = name;
        }
        if let Some(email) = patch.email {
            self.contact.email = email;
        }
        if let Some(phone) = patch.phone {
            self.contact.phone = phone;
        }
        if let Some(city) = patch.city {
            self.address.city = city;
        }
        if let Some(street) = patch.street {
            self.address.street = street;
        }
        if let Some(postal_code) = patch.postal_code {
            self.address.postal_code = postal_code;
        }
        if let Some(method) = patch.delivery_method_id {
            self.delivery_method_id = Some(method);
        }
        if let Some(shop) = patch.shop_id {
            self.shop_id = Some(shop);
        }
        if let Some(method) = patch.payment_method_id {
            self.payment_method_id = Some(method);
        }
        if let Some(comment) = patch.comment {
            self.comment = Some(comment).filter(|comment| !comment.is_empty());
        }

        previous_city.trim() != self.address.city.trim()
    }
}

/// A partial form update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub delivery_method_id: Option<DeliveryMethodId>,
    pub shop_id: Option<ShopId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_reports_city_changes_only() {
        let mut form = FormData::default();
        assert!(form.apply(FormPatch {
            city: Some("Kyiv".into()),
            ..FormPatch::default()
        }));
        assert!(!form.apply(FormPatch {
            city: Some(" Kyiv ".into()),
            name: Some("Olena".into()),
            ..FormPatch::default()
        }));
        assert_eq!(form.contact.name, "Olena");
        assert_eq!(form.city(), Some("Kyiv"));
    }

    #[test]
    fn blank_city_is_none() {
        let form = FormData::default();
        assert_eq!(form.city(), None);
    }
}
