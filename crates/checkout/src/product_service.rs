//! Catalog management.

use std::sync::Arc;

use demoshop_catalog::Product;
use demoshop_core::{DomainError, DomainResult, ProductId};
use demoshop_store::ProductRepository;

/// Catalog read and admin operations.
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub fn list_products(&self) -> DomainResult<Vec<Product>> {
        self.products.get_all()
    }

    pub fn get_product(&self, id: ProductId) -> DomainResult<Product> {
        self.products.get_by_id(id)
    }

    pub fn create_product(
        &self,
        name: &str,
        description: &str,
        price: u64,
        image_url: &str,
        stock: u32,
    ) -> DomainResult<Product> {
        validate_product_fields(name, description, price)?;
        let product = Product::new(name, description, price, image_url, stock);
        self.products.create(product.clone())?;
        Ok(product)
    }

    pub fn update_product(&self, product: Product) -> DomainResult<Product> {
        validate_product_fields(&product.name, &product.description, product.price)?;
        self.products.update(product.clone())?;
        Ok(product)
    }

    pub fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        self.products.delete(id)
    }

    pub fn update_stock(&self, id: ProductId, stock: u32) -> DomainResult<Product> {
        self.products.update_stock(id, stock)
    }
}

fn validate_product_fields(name: &str, description: &str, price: u64) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::invalid_input("product name must not be empty"));
    }
    if description.trim().is_empty() {
        return Err(DomainError::invalid_input(
            "product description must not be empty",
        ));
    }
    if price == 0 {
        return Err(DomainError::invalid_input("product price must be positive"));
    }
    Ok(())
}
