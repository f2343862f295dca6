//! Cart lines and the pure cart arithmetic shared by guest and account carts.
//!
//! A [`Cart`] serializes as a bare JSON array of lines, which is the format
//! the guest cart has always been persisted in on-device.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;

/// Denormalized copy of a catalog product, taken when it is added to a cart.
///
/// The snapshot is never refreshed from the catalog, so the price shown in a
/// guest cart can drift from the live catalog price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredSnapshot")]
pub struct ProductSnapshot {
    /// Catalog identifier. Read from `id`, or from `_id` when only the
    /// backend spelling is present.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Product image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any other product attributes, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of a snapshot. Guest lines carry both `_id` and `id`.
#[derive(Deserialize)]
struct StoredSnapshot {
    #[serde(default)]
    id: Option<ProductId>,
    #[serde(default, rename = "_id")]
    backend_id: Option<ProductId>,
    name: String,
    price: Decimal,
    #[serde(default)]
    image: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<StoredSnapshot> for ProductSnapshot {
    type Error = String;

    fn try_from(stored: StoredSnapshot) -> Result<Self, Self::Error> {
        let id = stored
            .id
            .or(stored.backend_id)
            .ok_or_else(|| "missing field `id`".to_string())?;
        Ok(Self {
            id,
            name: stored.name,
            price: stored.price,
            image: stored.image,
            extra: stored.extra,
        })
    }
}

impl ProductSnapshot {
    /// Create a snapshot with no extra attributes.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: None,
            extra: Map::new(),
        }
    }

    /// Attach an image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product attributes at the time the line was created.
    #[serde(flatten)]
    pub product: ProductSnapshot,
    /// Number of units, always at least 1.
    pub quantity: u32,
    /// Line subtotal as computed by the backend (account carts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,
}

impl CartLine {
    /// Create a line from a product snapshot.
    #[must_use]
    pub const fn new(product: ProductSnapshot, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            subtotal: None,
        }
    }

    /// The product identifier of this line.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// An ordered collection of cart lines with unique product IDs.
///
/// Insertion order is display order. All mutators preserve the invariants
/// that IDs are unique and that no line has a quantity of zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The lines in display order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up a line by product ID.
    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id() == id)
    }

    /// Whether a line for `id` exists.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.line(id).is_some()
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing line for the same product has its quantity increased (its
    /// snapshot is kept); otherwise a new line is appended. A zero quantity is
    /// ignored.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) {
        if quantity == 0 {
            return;
        }

        if let Some(existing) = self.lines.iter_mut().find(|line| line.id() == &product.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine::new(product, quantity));
        }
    }

    /// Set the quantity of an existing line.
    ///
    /// A quantity of zero removes the line. Returns `false` if no line for
    /// `id` exists (nothing is added).
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id);
        }

        match self.lines.iter_mut().find(|line| line.id() == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the line for `id`. Returns `false` if there was none.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id() != id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart from raw lines, dropping zero-quantity lines and folding
    /// duplicate IDs into the first occurrence.
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            let CartLine {
                product,
                quantity,
                subtotal,
            } = line;
            let is_new = !cart.contains(&product.id);
            cart.add(product, quantity);
            if is_new
                && quantity > 0
                && let Some(last) = cart.lines.last_mut()
            {
                last.subtotal = subtotal;
            }
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}
