//! Multi-charge sales: one main purchase plus optional cross-sales.

use common::SiteId;
use serde::{Deserialize, Serialize};

use super::{ChargeInformation, TransactionError};

/// One charge of a sale as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCharge {
    /// Site the charge is for. Required for cross-sales.
    pub site_id: Option<SiteId>,
    pub is_main_purchase: bool,
    pub charge: ChargeInformation,
}

impl SaleCharge {
    /// The main purchase. It defaults to the sale's site.
    pub fn main(charge: ChargeInformation) -> Self {
        Self {
            site_id: None,
            is_main_purchase: true,
            charge,
        }
    }

    /// A cross-sale on another site.
    pub fn cross_sale(site_id: SiteId, charge: ChargeInformation) -> Self {
        Self {
            site_id: Some(site_id),
            is_main_purchase: false,
            charge,
        }
    }
}

/// A charge of a validated sale, bound to its site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleItem {
    pub site_id: SiteId,
    pub charge: ChargeInformation,
}

/// A validated sale: exactly one main purchase, every cross-sale bound to a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    main: SaleItem,
    cross_sales: Vec<SaleItem>,
}

impl Sale {
    /// Validates a charge set.
    pub fn new(site_id: SiteId, charges: Vec<SaleCharge>) -> Result<Self, TransactionError> {
        let main_count = charges.iter().filter(|c| c.is_main_purchase).count();
        match main_count {
            0 => return Err(TransactionError::MainPurchaseNotFound),
            1 => {}
            count => return Err(TransactionError::MoreThanOneMainPurchase { count }),
        }

        let mut main = None;
        let mut cross_sales = Vec::with_capacity(charges.len() - 1);

        for (index, sale_charge) in charges.into_iter().enumerate() {
            sale_charge.charge.validate()?;

            if sale_charge.is_main_purchase {
                main = Some(SaleItem {
                    site_id: sale_charge.site_id.unwrap_or(site_id),
                    charge: sale_charge.charge,
                });
            } else {
                let site_id = sale_charge
                    .site_id
                    .ok_or(TransactionError::MissingCrossSaleSiteId { index })?;
                cross_sales.push(SaleItem {
                    site_id,
                    charge: sale_charge.charge,
                });
            }
        }

        let main = main.ok_or(TransactionError::MainPurchaseNotFound)?;
        Ok(Self { main, cross_sales })
    }

    pub fn main(&self) -> &SaleItem {
        &self.main
    }

    pub fn cross_sales(&self) -> &[SaleItem] {
        &self.cross_sales
    }

    /// Main purchase first, then cross-sales in submission order.
    pub fn items(&self) -> impl Iterator<Item = &SaleItem> {
        std::iter::once(&self.main).chain(self.cross_sales.iter())
    }
}
