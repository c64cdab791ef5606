use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::search;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn search(&self, needle: &str) -> Vec<&Product> {
        search::filter(&self.products, needle)
    }

    /// Products that may be attached to a parent item.
    pub fn accessories(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|product| product.accessory)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Catalog;
    use crate::domain::product::{PricingUnit, Product, ProductId};

    #[test]
    fn catalog_round_trips_as_a_plain_product_array() {
        let catalog: Catalog = serde_json::from_str(
            r#"[
                {"id": "tela", "name": "Tela Solar", "category": "toldo",
                 "unit_price": "95.5", "pricing_unit": "PER_AREA"},
                {"id": "motor", "name": "Motor Tubular", "category": "acessório",
                 "unit_price": "650", "pricing_unit": "PER_UNIT", "accessory": true}
            ]"#,
        )
        .expect("catalog json");

        assert_eq!(catalog.products().len(), 2);
        assert_eq!(
            catalog.find(&ProductId("motor".to_owned())).map(|p| p.pricing_unit),
            Some(PricingUnit::PerUnit)
        );
        assert!(catalog.find(&ProductId("missing".to_owned())).is_none());
        assert_eq!(catalog.accessories().map(|p| p.id.0.as_str()).collect::<Vec<_>>(), ["motor"]);
        assert_eq!(catalog.search("acessorio").len(), 1);
        assert_eq!(
            catalog.find(&ProductId("tela".to_owned())).map(|p| p.unit_price),
            Some(Decimal::new(955, 1))
        );

        let product: &Product = &catalog.products()[0];
        assert_eq!(product.name, "Tela Solar");
    }
}
