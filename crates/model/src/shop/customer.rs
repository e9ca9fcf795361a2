use crate::{error::RecordError, records::record::SourceRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Billing or shipping address, read from `<prefix>_<field>` columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub company: Option<String>,
    pub department: Option<String>,
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub country_iso: Option<String>,
    pub phone: Option<String>,
    pub vat_id: Option<String>,
}

impl Address {
    pub fn from_record(record: &SourceRecord, prefix: &str) -> Self {
        let field = |name: &str| record.string(&format!("{prefix}_{name}"));
        let street = match (field("street"), field("streetnumber")) {
            (Some(street), Some(number)) => Some(format!("{street} {number}")),
            (street, _) => street,
        };
        Address {
            company: field("company"),
            department: field("department"),
            salutation: field("salutation"),
            first_name: field("firstname"),
            last_name: field("lastname"),
            street,
            zip_code: field("zipcode"),
            city: field("city"),
            country_iso: field("countryiso"),
            phone: field("phone"),
            vat_id: field("ustid"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.company.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub source_id: String,
    pub customer_number: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub encoder: Option<String>,
    pub active: bool,
    pub newsletter: bool,
    pub first_login: Option<NaiveDateTime>,
    pub last_login: Option<NaiveDateTime>,
    pub customer_group: Option<String>,
    pub shop: Option<String>,
    pub language: Option<String>,
    pub payment: Option<String>,
    pub billing: Address,
    pub shipping: Option<Address>,
}

impl CustomerRecord {
    pub fn from_record(record: &SourceRecord) -> Result<Self, RecordError> {
        let email = record
            .string("email")
            .map(|e| e.to_lowercase())
            .ok_or_else(|| RecordError::Missing("email".into()))?;
        if !email.contains('@') {
            return Err(RecordError::Invalid {
                field: "email".into(),
                value: email,
            });
        }

        let shipping = Some(Address::from_record(record, "shipping")).filter(|a| !a.is_empty());

        Ok(CustomerRecord {
            source_id: record
                .string_any(&["customerID", "customer_id", "id"])
                .ok_or_else(|| RecordError::Missing("customerID".into()))?,
            customer_number: record.string("customernumber"),
            email,
            password_hash: record.string_any(&["md5_password", "password"]),
            encoder: record.string("encoder"),
            active: record.bool("active")?.unwrap_or(true),
            newsletter: record.bool("newsletter")?.unwrap_or(false),
            first_login: record.datetime("firstlogin"),
            last_login: record.datetime("lastlogin"),
            customer_group: record.string_any(&["customergroup", "customergroupID"]),
            shop: record.string_any(&["subshopID", "shopID"]),
            language: record.string("language"),
            payment: record.string_any(&["paymentID", "payment"]),
            billing: Address::from_record(record, "billing"),
            shipping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_prefixed_addresses() {
        let record = SourceRecord::new()
            .with("customerID", 3)
            .with("email", "Jane@Example.com")
            .with("billing_firstname", "Jane")
            .with("billing_street", "Main St")
            .with("billing_streetnumber", "5");
        let customer = CustomerRecord::from_record(&record).unwrap();
        assert_eq!(customer.email, "jane@example.com");
        assert_eq!(customer.billing.street.as_deref(), Some("Main St 5"));
        assert_eq!(customer.shipping, None);
    }

    #[test]
    fn rejects_addresses_without_at() {
        let record = SourceRecord::new().with("customerID", 3).with("email", "nobody");
        assert!(CustomerRecord::from_record(&record).is_err());
    }
}
