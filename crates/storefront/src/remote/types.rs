//! Wire types for the storefront cart REST API.

use pharmacart_core::{CartLine, ProductId, ProductSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `GET /cart/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartResponse {
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// One line of the account cart as the backend reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCartItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    /// Populated product document; `null` when the product was deleted.
    #[serde(default)]
    pub product: Option<RemoteProduct>,
}

/// Product document embedded in a cart item.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /cart/add` and `PUT /cart/update`.
#[derive(Debug, Clone, Serialize)]
pub struct LineQuantityRequest<'a> {
    pub product_id: &'a str,
    pub quantity: u32,
}

/// FastAPI-style error body (`{"detail": ...}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Human-readable message from `detail`.
    ///
    /// `detail` is either a string or a list of validation entries carrying a
    /// `msg` field.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(entries) => {
                let messages: Vec<_> = entries
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(Value::as_str))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Extract the most useful message from an error response body.
pub(super) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl RemoteCartItem {
    /// Convert into a cart line, or `None` for non-positive quantities.
    ///
    /// The line ID always comes from `product_id`; any ID fields inside the
    /// embedded product document are dropped.
    #[must_use]
    pub fn into_line(self) -> Option<CartLine> {
        let quantity = u32::try_from(self.quantity).ok().filter(|q| *q > 0)?;

        let RemoteProduct {
            name,
            price,
            image,
            mut extra,
        } = self.product.unwrap_or_else(|| RemoteProduct {
            name: String::new(),
            price: Decimal::ZERO,
            image: None,
            extra: Map::new(),
        });
        extra.remove("_id");
        extra.remove("id");

        Some(CartLine {
            product: ProductSnapshot {
                id: self.product_id,
                name,
                price,
                image,
                extra,
            },
            quantity,
            subtotal: self.subtotal,
        })
    }
}

impl CartResponse {
    /// Convert every valid item into a cart line, preserving order.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.items
            .into_iter()
            .filter_map(RemoteCartItem::into_line)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_response_conversion() {
        let json = r#"{
            "items": [
                {
                    "product_id": "p1",
                    "quantity": 2,
                    "subtotal": 65.0,
                    "product": {
                        "_id": "p1",
                        "name": "Paracetamol 500mg",
                        "price": 32.5,
                        "image": "https://cdn.example.in/p1.jpg",
                        "requires_prescription": false
                    }
                }
            ]
        }"#;

        let response: CartResponse = serde_json::from_str(json).unwrap();
        let lines = response.into_lines();
        assert_eq!(lines.len(), 1);

        let line = &lines[0];
        assert_eq!(line.id().as_str(), "p1");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.subtotal, Some(Decimal::new(65, 0)));
        assert_eq!(line.product.name, "Paracetamol 500mg");
        assert_eq!(line.product.price, Decimal::new(325, 1));
        assert_eq!(
            line.product.image.as_deref(),
            Some("https://cdn.example.in/p1.jpg")
        );
        assert!(!line.product.extra.contains_key("_id"));
        assert_eq!(line.product.extra["requires_prescription"], false);
    }

    #[test]
    fn test_missing_items_is_empty_cart() {
        let response: CartResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_lines().is_empty());
    }

    #[test]
    fn test_deleted_product_keeps_line() {
        let json = r#"{"items": [{"product_id": "gone", "quantity": 1, "product": null}]}"#;
        let lines = serde_json::from_str::<CartResponse>(json)
            .unwrap()
            .into_lines();
        assert_eq!(lines[0].id().as_str(), "gone");
        assert_eq!(lines[0].product.price, Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_quantities_dropped() {
        let json = r#"{"items": [
            {"product_id": "a", "quantity": 0},
            {"product_id": "b", "quantity": -3},
            {"product_id": "c", "quantity": 1}
        ]}"#;
        let lines = serde_json::from_str::<CartResponse>(json)
            .unwrap()
            .into_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id().as_str(), "c");
    }

    #[test]
    fn test_line_quantity_request_body() {
        let body = LineQuantityRequest {
            product_id: "p1",
            quantity: 3,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"product_id": "p1", "quantity": 3})
        );
    }

    #[test]
    fn test_error_message_string_detail() {
        assert_eq!(
            error_message(r#"{"detail": "Insufficient stock"}"#),
            "Insufficient stock"
        );
    }

    #[test]
    fn test_error_message_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "quantity"], "msg": "must be positive"},
                                  {"loc": ["body", "product_id"], "msg": "field required"}]}"#;
        assert_eq!(error_message(body), "must be positive; field required");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("Internal Server Error"), "Internal Server Error");
        assert_eq!(error_message(r#"{"detail": null}"#), r#"{"detail": null}"#);
    }
}
