//! Order request hand-off.
//!
//! Orders are not placed through the API. A signed-in customer with a
//! complete profile sends the cart to the shop as a WhatsApp message; this
//! module computes the bill and builds that message and its links.

use std::fmt::Write as _;

use pharmacart_core::{AuthState, Cart, MobileNumber, MobileNumberError, Price};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::CheckoutConfig;

const RULE: &str = "━━━━━━━━━━━━━━━━";

/// Reasons a checkout cannot proceed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please log in to proceed with checkout")]
    LoginRequired,

    #[error("Your cart is empty")]
    EmptyCart,

    /// Names the profile fields that are blank.
    #[error("Incomplete profile: missing {}", .0.join(", "))]
    IncompleteProfile(Vec<&'static str>),

    #[error("Invalid mobile number: {0}")]
    InvalidMobile(#[from] MobileNumberError),

    #[error("No shop WhatsApp number is configured")]
    MissingShopNumber,
}

/// Bill for the current cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

impl OrderSummary {
    /// The delivery fee is charged only when the subtotal is positive.
    #[must_use]
    pub fn from_cart(cart: &Cart, delivery_fee: Decimal) -> Self {
        let subtotal = cart.total_price();
        let fee = if subtotal > Decimal::ZERO {
            delivery_fee
        } else {
            Decimal::ZERO
        };

        Self {
            subtotal: Price::inr(subtotal),
            delivery_fee: Price::inr(fee),
            total: Price::inr(subtotal + fee),
        }
    }
}

/// Delivery details of the customer placing the order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerProfile {
    pub username: String,
    pub mobile: String,
    pub address: String,
    pub email: Option<String>,
}

impl CustomerProfile {
    /// Check that name, mobile and address are present and the mobile
    /// number is well formed.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteProfile` listing every blank field, or
    /// `InvalidMobile`.
    pub fn ensure_complete(&self) -> Result<MobileNumber, CheckoutError> {
        let missing: Vec<&'static str> = [
            ("name", &self.username),
            ("mobile", &self.mobile),
            ("address", &self.address),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(CheckoutError::IncompleteProfile(missing));
        }

        Ok(MobileNumber::parse(&self.mobile)?)
    }

    fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// Render the order request text sent to the shop.
#[must_use]
pub fn order_message(cart: &Cart, profile: &CustomerProfile, summary: &OrderSummary) -> String {
    let or_na = |value: &str| {
        let value = value.trim();
        if value.is_empty() { "N/A".to_string() } else { value.to_string() }
    };

    let mut message = String::from("🛒 *New Order Request*\n\n");

    message.push_str("👤 *Customer Details:*\n");
    let _ = writeln!(message, "Name: {}", or_na(&profile.username));
    let _ = writeln!(message, "Mobile: {}", or_na(&profile.mobile));
    let _ = writeln!(message, "Address: {}", or_na(&profile.address));
    if let Some(email) = profile.email() {
        let _ = writeln!(message, "Email: {email}");
    }
    let _ = write!(message, "\n{RULE}\n\n");

    message.push_str("📦 *Order Details:*\n");
    for (index, line) in cart.lines().iter().enumerate() {
        let unit = Price::inr(line.product.price);
        let _ = writeln!(message, "{}. *{}*", index + 1, line.product.name);
        let _ = writeln!(message, "   Quantity: {}", line.quantity);
        let _ = writeln!(
            message,
            "   Price: {unit} × {} = {}\n",
            line.quantity,
            unit.times(line.quantity)
        );
    }

    let _ = writeln!(message, "{RULE}");
    let _ = writeln!(message, "💰 *Subtotal:* {}", summary.subtotal);
    let _ = writeln!(message, "🚚 *Delivery Fee:* {}", summary.delivery_fee);
    let _ = writeln!(message, "{RULE}");
    let _ = writeln!(message, "✅ *Total Amount:* {}\n", summary.total);
    message.push_str("Please confirm my order. Thank you!");

    message
}

/// Links that open a chat with the shop, pre-filled with the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppLink {
    /// Deep link handled by the installed app.
    pub app_url: String,
    /// Browser fallback when the app is missing.
    pub web_url: String,
}

impl WhatsAppLink {
    #[must_use]
    pub fn new(phone: &MobileNumber, message: &str) -> Self {
        let text = urlencoding::encode(message);
        Self {
            app_url: format!("whatsapp://send?phone={phone}&text={text}"),
            web_url: format!("https://wa.me/{phone}?text={text}"),
        }
    }
}

/// Everything needed to hand an order to the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub summary: OrderSummary,
    pub message: String,
    pub link: WhatsAppLink,
}

/// Validate the session, cart and profile, then build the order request.
///
/// # Errors
///
/// Returns [`CheckoutError`] for a guest session, an empty cart, an
/// incomplete profile or a missing shop number.
pub fn prepare_order(
    auth: &AuthState,
    cart: &Cart,
    profile: &CustomerProfile,
    config: &CheckoutConfig,
) -> Result<OrderRequest, CheckoutError> {
    if auth.account_token().is_none() {
        return Err(CheckoutError::LoginRequired);
    }
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    profile.ensure_complete()?;
    let shop = config
        .whatsapp_number
        .as_ref()
        .ok_or(CheckoutError::MissingShopNumber)?;

    let summary = OrderSummary::from_cart(cart, config.delivery_fee);
    let message = order_message(cart, profile, &summary);
    let link = WhatsAppLink::new(shop, &message);

    Ok(OrderRequest {
        summary,
        message,
        link,
    })
}
