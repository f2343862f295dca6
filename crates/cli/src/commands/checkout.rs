//! Order request command.

use pharmacart_storefront::StorefrontConfig;
use pharmacart_storefront::checkout::{CustomerProfile, prepare_order};

use super::{CommandError, Session};

/// Print the order message and the links that send it to the shop.
#[allow(clippy::print_stdout)]
pub fn run(
    session: &Session,
    config: &StorefrontConfig,
    profile: &CustomerProfile,
) -> Result<(), CommandError> {
    let cart = session.sync.state().cart;
    let order = prepare_order(&session.auth, &cart, profile, &config.checkout)?;

    tracing::info!(
        lines = cart.len(),
        total = %order.summary.total,
        "Order request prepared"
    );

    println!("{}\n", order.message);
    println!("Open in WhatsApp: {}", order.link.app_url);
    println!("Or in a browser:  {}", order.link.web_url);
    Ok(())
}
