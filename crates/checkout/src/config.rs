//! Checkout policy switches.

/// Policies applied by the checkout coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckoutConfig {
    /// Put a cancelled order's quantities back on the shelf.
    ///
    /// Off by default: cancelling only changes the order's status.
    pub restock_on_cancel: bool,
}

impl CheckoutConfig {
    /// Sets the restock-on-cancel policy.
    pub fn with_restock_on_cancel(mut self, restock: bool) -> Self {
        self.restock_on_cancel = restock;
        self
    }
}
