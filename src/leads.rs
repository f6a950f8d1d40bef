use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// "Sell your car" valuation request from the public site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellRequest {
    pub name: String,
    pub email: String,
    pub contact: String,
    pub brand: String,
    pub model: String,
    pub year: String,
    pub mileage: String,
}

impl SellRequest {
    /// Checks the fields the sales team needs to follow up
    pub fn validate(&self) -> Result<(), String> {
        for (value, label) in [
            (&self.name, "name"),
            (&self.contact, "contact"),
            (&self.brand, "brand"),
            (&self.model, "model"),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{label} is required"));
            }
        }
        Ok(())
    }

    /// Inquiry text forwarded to the sales WhatsApp line
    pub fn whatsapp_message(&self) -> String {
        format!(
            "*New Car Valuation Request*\n\
             Name: {}\n\
             Email: {}\n\
             Contact: {}\n\
             Car: {} {} {}\n\
             Mileage: {} km",
            self.name, self.email, self.contact, self.year, self.brand, self.model, self.mileage
        )
    }

    /// wa.me deep link carrying the rendered message
    pub fn whatsapp_url(&self, number: &str) -> String {
        let text: String =
            form_urlencoded::byte_serialize(self.whatsapp_message().as_bytes()).collect();
        format!("https://wa.me/{number}?text={text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SellRequest {
        SellRequest {
            name: "Aina".to_string(),
            email: "aina@example.com".to_string(),
            contact: "0123456789".to_string(),
            brand: "BMW".to_string(),
            model: "M4".to_string(),
            year: "2021".to_string(),
            mileage: "42,000".to_string(),
        }
    }

    #[test]
    fn validation_requires_contactable_fields() {
        assert!(request().validate().is_ok());

        let missing = SellRequest {
            contact: String::new(),
            ..request()
        };
        assert_eq!(missing.validate().unwrap_err(), "contact is required");
    }

    #[test]
    fn message_renders_the_inquiry_block() {
        let message = request().whatsapp_message();
        assert!(message.starts_with("*New Car Valuation Request*"));
        assert!(message.contains("Car: 2021 BMW M4"));
        assert!(message.contains("Mileage: 42,000 km"));
    }

    #[test]
    fn url_is_form_encoded() {
        let url = request().whatsapp_url("601119453913");
        assert!(url.starts_with("https://wa.me/601119453913?text="));
        assert!(!url.contains(' '));
        assert!(!url.contains('\n'));
    }
}
