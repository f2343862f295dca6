//! Cart commands.

use pharmacart_core::{Price, ProductId, ProductSnapshot};
use rust_decimal::Decimal;

use super::{CommandError, Session};

pub async fn add(
    session: &Session,
    id: String,
    name: String,
    price: Decimal,
    quantity: u32,
    image: Option<String>,
) -> Result<(), CommandError> {
    let mut product = ProductSnapshot::new(id, name, price);
    if let Some(image) = image {
        product = product.with_image(image);
    }
    session.sync.add_item(product, quantity).await?;
    Ok(())
}

pub async fn remove(session: &Session, id: &str) -> Result<(), CommandError> {
    session.sync.remove_item(&ProductId::new(id)).await?;
    Ok(())
}

pub async fn update(session: &Session, id: &str, quantity: i64) -> Result<(), CommandError> {
    session
        .sync
        .update_quantity(&ProductId::new(id), quantity)
        .await?;
    Ok(())
}

pub async fn increment(session: &Session, id: &str) -> Result<(), CommandError> {
    session.sync.increment(&ProductId::new(id)).await?;
    Ok(())
}

pub async fn decrement(session: &Session, id: &str) -> Result<(), CommandError> {
    session.sync.decrement(&ProductId::new(id)).await?;
    Ok(())
}

pub async fn clear(session: &Session) -> Result<(), CommandError> {
    session.sync.clear().await?;
    Ok(())
}

/// Print the cart as a table.
#[allow(clippy::print_stdout)]
pub fn print(session: &Session) {
    let state = session.sync.state();
    let owner = if session.auth.account_token().is_some() {
        "Account cart"
    } else {
        "Guest cart"
    };

    if state.lines().is_empty() {
        println!("{owner} is empty");
        return;
    }

    println!("{owner}:");
    for line in state.lines() {
        println!(
            "  {:<12} {:<32} {:>4} x {:>10} = {:>10}",
            line.id().as_str(),
            line.product.name,
            line.quantity,
            Price::inr(line.product.price).display(),
            Price::inr(line.line_total()).display(),
        );
    }
    println!(
        "  {} item(s), total {}",
        state.cart.total_item_count(),
        Price::inr(state.cart.total_price()).display()
    );
}
