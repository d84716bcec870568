//! Catalog domain module.
//!
//! This crate contains the product entity and its business rules, the
//! storage-agnostic repository boundary, and the use cases that orchestrate
//! them. It performs no IO itself; storage comes in through
//! [`ProductRepository`].

pub mod in_memory;
pub mod product;
pub mod query;
pub mod repository;
pub mod usecases;

pub use in_memory::InMemoryProductRepository;
pub use product::{NewProduct, Product, ProductChanges, ProductRecord};
pub use query::{Page, PageMeta, Pagination, ProductFilter, SortField, SortOrder};
pub use repository::{ProductRepository, RepositoryError, RepositoryResult, StockAdjustment};
pub use usecases::{ErrorCode, UseCaseError, UseCaseResult};
